// src/models/mod.rs

pub mod dashboard;
pub mod event;
pub mod exam_result;
pub mod fee;
pub mod response;
pub mod staff;
pub mod student;
pub mod user;
