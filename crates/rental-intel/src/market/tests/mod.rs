mod common;
mod contributions;
mod matching;
mod recommendations;
mod snapshots;
