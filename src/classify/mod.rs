pub mod find_match;
pub mod genome_tax;
pub mod scores;

pub use find_match::find_match;
pub use genome_tax::infer_genome_tax;
pub use scores::{assign_donors, make_score_table};
