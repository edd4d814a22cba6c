mod lib;

mod filtering;
mod hooks;
mod ordering;
mod reporting;
mod shared;
