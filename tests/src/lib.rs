//! Workspace test suite, grouped by component.


#[cfg(test)]
mod exec;
#[cfg(test)]
mod frontend;
#[cfg(test)]
mod integration;
