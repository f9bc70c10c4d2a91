pub mod graph_contract;
pub mod ignore_rules;
pub mod inventory;
pub mod linking;
pub mod merge;
pub mod orchestrator;
pub mod records;
pub mod stable_ids;
pub mod structure;
pub mod text;
pub mod types;
