pub mod commands;

pub use commands::{
    compute, compute_all, export, list_projects, render_records, render_report, seed, show,
};
