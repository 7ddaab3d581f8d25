mod common;
mod compute;
