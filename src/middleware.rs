// src/middleware.rs

pub mod session;
