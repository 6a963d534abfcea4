mod helpers;
mod listener;
mod negotiation;
mod ws;
