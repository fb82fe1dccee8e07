mod common;
mod session;
mod workflow;
