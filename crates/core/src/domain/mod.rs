pub mod contract;
pub mod freshness;
pub mod report;

#[cfg(test)]
pub mod testing;
