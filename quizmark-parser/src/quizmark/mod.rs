//! Main module for quizmark library functionality

pub mod ast;
pub mod inlines;
pub mod lexing;
pub mod normalization;
pub mod parsing;
pub mod testing;
pub mod validation;
