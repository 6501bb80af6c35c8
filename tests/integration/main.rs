//! Integration tests for treesnap snapshot stores


mod capture;
mod lifecycle;
