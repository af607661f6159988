//! pricing-service: effective delivery-fee resolution and pricing rule administration.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pricing;
pub mod services;
pub mod startup;
