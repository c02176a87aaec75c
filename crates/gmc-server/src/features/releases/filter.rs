//! Release/site join and visibility predicate
//!
//! [`ReleaseQuery`] accumulates joins, conditions and positional binds the same
//! way the dynamic list queries do (`$n` placeholders numbered by bind order),
//! and adds a stage parameter so the visibility predicate can only be applied
//! once `ensembl_release` is in scope under the alias `er`:
//!
//! ```rust,ignore
//! let query = ReleaseQuery::new("SELECT gd.genome_id FROM genome_dataset gd")
//!     .join_release("LEFT JOIN ensembl_release er ON er.release_id = gd.release_id")
//!     .with_visibility(&policy, None);
//! ```
//!
//! `ReleaseQuery::<Base>` has no `with_visibility`, so forgetting the release
//! join is a compile error rather than malformed SQL.

use std::marker::PhantomData;

use gmc_common::ReleaseStatus;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use crate::visibility::VisibilityPolicy;

/// A value bound to one `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Ints(Vec<i32>),
    Floats(Vec<f64>),
    Texts(Vec<String>),
    Uuids(Vec<Uuid>),
}

/// Stage marker: no release table joined yet.
#[derive(Debug, Clone, Copy)]
pub struct Base;

/// Stage marker: `ensembl_release er` is part of the FROM clause.
#[derive(Debug, Clone, Copy)]
pub struct WithRelease;

/// Incrementally built SELECT with positional binds.
#[derive(Debug, Clone)]
pub struct ReleaseQuery<Stage = Base> {
    select: String,
    joins: Vec<String>,
    conditions: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    page: Option<(String, String)>,
    binds: Vec<SqlValue>,
    site_joined: bool,
    status_filtered: bool,
    _stage: PhantomData<Stage>,
}

impl ReleaseQuery<Base> {
    /// Start from a `SELECT ... FROM ...` prefix.
    pub fn new(select: impl Into<String>) -> Self {
        Self::with_select(select.into())
    }

    /// Bring `ensembl_release` into scope.
    ///
    /// `clause` must be a complete join that aliases the table as `er`, for
    /// example `JOIN ensembl_release er ON er.release_id = gr.release_id`.
    pub fn join_release(mut self, clause: impl Into<String>) -> ReleaseQuery<WithRelease> {
        self.joins.push(clause.into());
        self.into_stage()
    }
}

impl ReleaseQuery<WithRelease> {
    /// Start from a prefix that already selects `FROM ensembl_release er`.
    pub fn from_releases(select: impl Into<String>) -> Self {
        Self::with_select(select.into())
    }

    /// Join the site table and restrict rows according to `policy`.
    ///
    /// - Unreleased hidden: inner join to the current site and require
    ///   `er.status = 'Released'`; `status` is ignored.
    /// - Unreleased visible: outer join to the current site so site-less releases
    ///   survive, narrowed to `status` when one is given.
    ///
    /// Repeated calls leave the query unchanged; the first call decides.
    pub fn with_visibility(mut self, policy: &VisibilityPolicy, status: Option<ReleaseStatus>) -> Self {
        if !self.site_joined {
            let site = self.push_bind(SqlValue::Int(policy.current_site_id));
            let join = if policy.allow_unreleased { "LEFT JOIN" } else { "JOIN" };
            self.joins.push(format!(
                "{} ensembl_site es ON es.site_id = er.site_id AND es.site_id = {}",
                join, site
            ));
            if !policy.allow_unreleased {
                self.conditions.push("er.status = 'Released'".to_string());
            }
            self.site_joined = true;
            tracing::trace!(allow_unreleased = policy.allow_unreleased, "Applied release visibility");
        }

        if policy.allow_unreleased && !self.status_filtered {
            if let Some(status) = status {
                let placeholder = self.push_bind(SqlValue::Text(status.as_str().to_string()));
                self.conditions.push(format!("er.status::text = {}", placeholder));
                self.status_filtered = true;
            }
        }

        self
    }

    /// Restrict to releases of the named sites.
    ///
    /// Must follow [`with_visibility`](Self::with_visibility), which owns the site join.
    pub fn filter_site_names(self, names: &[String]) -> Self {
        debug_assert!(self.site_joined, "site names filtered before the site join");
        if names.is_empty() {
            return self;
        }
        self.filter_in("es.name", SqlValue::Texts(names.to_vec()))
    }

    /// Whether the site join has been added.
    pub fn has_visibility(&self) -> bool {
        self.site_joined
    }
}

impl<Stage> ReleaseQuery<Stage> {
    fn with_select(select: String) -> Self {
        Self {
            select,
            joins: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            page: None,
            binds: Vec::new(),
            site_joined: false,
            status_filtered: false,
            _stage: PhantomData,
        }
    }

    fn into_stage<Next>(self) -> ReleaseQuery<Next> {
        ReleaseQuery {
            select: self.select,
            joins: self.joins,
            conditions: self.conditions,
            group_by: self.group_by,
            order_by: self.order_by,
            page: self.page,
            binds: self.binds,
            site_joined: self.site_joined,
            status_filtered: self.status_filtered,
            _stage: PhantomData,
        }
    }

    /// Record a bind and return its placeholder.
    pub fn push_bind(&mut self, value: SqlValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Add a raw condition that carries no binds.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn filter_eq(mut self, column: &str, value: SqlValue) -> Self {
        let placeholder = self.push_bind(value);
        self.conditions.push(format!("{} = {}", column, placeholder));
        self
    }

    /// `column = ANY($n)`; `values` should be one of the list variants.
    pub fn filter_in(mut self, column: &str, values: SqlValue) -> Self {
        let placeholder = self.push_bind(values);
        self.conditions.push(format!("{} = ANY({})", column, placeholder));
        self
    }

    pub fn filter_not_in(mut self, column: &str, values: SqlValue) -> Self {
        let placeholder = self.push_bind(values);
        self.conditions.push(format!("NOT ({} = ANY({}))", column, placeholder));
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn order_by(mut self, columns: &[&str]) -> Self {
        self.order_by.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        let limit = self.push_bind(SqlValue::BigInt(limit));
        let offset = self.push_bind(SqlValue::BigInt(offset));
        self.page = Some((limit, offset));
        self
    }

    pub fn binds(&self) -> &[SqlValue] {
        &self.binds
    }

    /// Render the statement.
    pub fn sql(&self) -> String {
        let mut sql = self.select.clone();

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some((limit, offset)) = &self.page {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        sql
    }

    /// Execute and map every row.
    pub async fn fetch_all<'e, T, E>(&self, executor: E) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let sql = self.sql();
        tracing::debug!(sql = %sql, binds = self.binds.len(), "Executing catalog query");

        let mut query = sqlx::query_as::<Postgres, T>(&sql);
        for value in &self.binds {
            query = bind_value(query, value);
        }
        query.fetch_all(executor).await
    }
}

fn bind_value<'q, T>(
    query: QueryAs<'q, Postgres, T, PgArguments>,
    value: &SqlValue,
) -> QueryAs<'q, Postgres, T, PgArguments> {
    match value {
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Uuid(v) => query.bind(*v),
        SqlValue::Ints(v) => query.bind(v.clone()),
        SqlValue::Floats(v) => query.bind(v.clone()),
        SqlValue::Texts(v) => query.bind(v.clone()),
        SqlValue::Uuids(v) => query.bind(v.clone()),
    }
}
