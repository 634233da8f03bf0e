//! Syllabus daemon: configuration loading, runtime wiring and the
//! `syllabus` command line.

pub mod bootstrap;
pub mod cli;
