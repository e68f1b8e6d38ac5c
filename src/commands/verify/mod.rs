mod checks;
mod compare;
mod report;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;
