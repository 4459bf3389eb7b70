pub mod config;
pub mod cycle;
pub mod db;
pub mod distribute;
pub mod llm;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod plan;
pub mod profile;
pub mod prompt;
pub mod recovery;

#[cfg(test)]
mod test_utils;
