mod common;
mod deletion;
