mod extract;
mod load;
mod normalize;
mod run;
mod walker;

pub use run::run;
