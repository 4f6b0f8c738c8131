//! In-memory backend whose responses are scripted per SQL text.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use slt_harness::{Backend, QueryOutput};

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    engine: String,
    queries: HashMap<String, Result<QueryOutput, String>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    init_error: Option<String>,
    pub executed: Vec<String>,
    pub inits: usize,
}

impl ScriptedBackend {
    pub fn new(engine: &str) -> Self {
        Self {
            engine: engine.to_owned(),
            ..Self::default()
        }
    }

    /// Answer `sql` with the given schema and values.
    pub fn query(mut self, sql: &str, schema: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|v| (*v).to_owned()).collect();
        self.queries
            .insert(sql.to_owned(), Ok(QueryOutput::new(schema, values)));
        self
    }

    /// Answer `sql` with an error.
    pub fn query_error(mut self, sql: &str, message: &str) -> Self {
        self.queries.insert(sql.to_owned(), Err(message.to_owned()));
        self
    }

    /// Make statement `sql` fail.
    pub fn failing(mut self, sql: &str) -> Self {
        self.failing.insert(sql.to_owned());
        self
    }

    /// Make any call with text `sql` panic.
    pub fn panicking(mut self, sql: &str) -> Self {
        self.panicking.insert(sql.to_owned());
        self
    }

    pub fn init_error(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_owned());
        self
    }
}

impl Backend for ScriptedBackend {
    fn engine(&self) -> &str {
        &self.engine
    }

    fn init(&mut self) -> Result<(), String> {
        self.inits += 1;
        self.init_error.clone().map_or(Ok(()), Err)
    }

    fn execute_statement(&mut self, sql: &str) -> Result<(), String> {
        self.executed.push(sql.to_owned());
        if self.panicking.contains(sql) {
            panic!("scripted panic for {sql}\nsecond line");
        }
        if self.failing.contains(sql) {
            return Err(format!("statement rejected: {sql}"));
        }
        Ok(())
    }

    fn execute_query(&mut self, sql: &str) -> Result<QueryOutput, String> {
        self.executed.push(sql.to_owned());
        if self.panicking.contains(sql) {
            panic!("scripted panic for {sql}");
        }
        self.queries
            .get(sql)
            .cloned()
            .unwrap_or_else(|| Err(format!("no scripted answer for: {sql}")))
    }
}
