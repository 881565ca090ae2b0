pub(crate) mod parse;
pub(crate) mod prompt;
pub(crate) mod run;

#[cfg(test)]
mod tests;
