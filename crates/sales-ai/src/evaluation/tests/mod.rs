mod common;

mod analyzer;
