//! Wrappers over built-in ``burn::nn`` layers.
pub mod activation_wrapper;
pub mod normalization_wrapper;
