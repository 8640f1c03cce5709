pub mod bridge;
pub mod controller;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
pub mod store;
pub mod view;
pub mod worker;
