pub mod answer;
pub mod chat;
pub mod graph;
