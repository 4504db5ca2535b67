//! SQLite-backed fact store.
//!
//! Facts keep denormalized `field_id` / `development_object_id` columns and
//! are read pre-joined with `fields.name`. Amounts are stored as integer
//! thousandths so sums read back exactly. A fact's well, when set, must
//! belong to the fact's field and produce the fact's fluid; the composite
//! foreign key enforces that.

use std::path::Path;
use std::str::FromStr;

use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::debug;

use super::{FactSink, FactStore, FieldRecord, NewFact};
use crate::dynamics::{
    Amount, DepositComplex, DynamicsError, DynamicsResult, FactFilterSpec, FluidType,
    ProductionFact,
};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS fields (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    operator TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS development_objects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    field_id INTEGER NOT NULL REFERENCES fields(id),
    deposit_complex TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS wells (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    field_id INTEGER NOT NULL REFERENCES fields(id),
    fluid_type TEXT NOT NULL,
    UNIQUE (id, field_id, fluid_type)
);
CREATE TABLE IF NOT EXISTS production (
    id INTEGER PRIMARY KEY,
    well_id INTEGER,
    field_id INTEGER NOT NULL REFERENCES fields(id),
    development_object_id INTEGER NOT NULL REFERENCES development_objects(id),
    fluid_type TEXT NOT NULL,
    date TEXT NOT NULL,
    amount_milli INTEGER NOT NULL CHECK (amount_milli >= 0),
    unit TEXT NOT NULL,
    FOREIGN KEY (well_id, field_id, fluid_type) REFERENCES wells(id, field_id, fluid_type)
);
CREATE INDEX IF NOT EXISTS idx_production_date ON production(date);
CREATE INDEX IF NOT EXISTS idx_production_fluid ON production(fluid_type);
CREATE INDEX IF NOT EXISTS idx_production_field ON production(field_id);
CREATE INDEX IF NOT EXISTS idx_production_well ON production(well_id);
CREATE INDEX IF NOT EXISTS idx_wells_field ON wells(field_id);
CREATE INDEX IF NOT EXISTS idx_objects_complex ON development_objects(deposit_complex);
";

const SELECT_FACTS: &str = "SELECT p.field_id, f.name, p.development_object_id, p.fluid_type,
        p.date, p.amount_milli, p.unit
 FROM production p
 JOIN fields f ON f.id = p.field_id";

pub struct SqliteFactStore {
    conn: Connection,
}

impl SqliteFactStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub fn open(path: &Path) -> DynamicsResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> DynamicsResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn ensure_schema(&self) -> DynamicsResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn insert_field(&self, name: &str, operator: &str) -> DynamicsResult<i64> {
        self.conn.execute(
            "INSERT INTO fields (name, operator) VALUES (?1, ?2)",
            params![name, operator],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_development_object(
        &self,
        field_id: i64,
        name: &str,
        complex: DepositComplex,
    ) -> DynamicsResult<i64> {
        self.conn.execute(
            "INSERT INTO development_objects (name, field_id, deposit_complex)
             VALUES (?1, ?2, ?3)",
            params![name, field_id, complex.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_well(&self, field_id: i64, name: &str, fluid: FluidType) -> DynamicsResult<i64> {
        self.conn.execute(
            "INSERT INTO wells (name, field_id, fluid_type) VALUES (?1, ?2, ?3)",
            params![name, field_id, fluid.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert `facts` in one transaction; nothing is written if any row fails.
    pub fn insert_facts(&mut self, facts: &[NewFact]) -> DynamicsResult<usize> {
        let tx = self.conn.transaction()?;
        for fact in facts {
            insert_fact_row(&tx, fact)?;
        }
        tx.commit()?;
        Ok(facts.len())
    }

    pub fn fact_count(&self) -> DynamicsResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM production", [], |r| r.get(0))?)
    }

    pub fn fields(&self) -> DynamicsResult<Vec<FieldRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, operator FROM fields ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(FieldRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                operator: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl FactStore for SqliteFactStore {
    fn fetch_facts(&self, spec: &FactFilterSpec) -> DynamicsResult<Vec<ProductionFact>> {
        let (parts, bind_values) = build_where_parts(spec);
        let sql = format!("{SELECT_FACTS}\n WHERE {}", parts.join(" AND "));
        debug!(sql = %sql, params = bind_values.len(), "fetching production facts");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values.iter()), decode_fact)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl FactSink for SqliteFactStore {
    fn add_field(&mut self, name: &str, operator: &str) -> DynamicsResult<i64> {
        self.insert_field(name, operator)
    }

    fn add_development_object(
        &mut self,
        field_id: i64,
        name: &str,
        complex: DepositComplex,
    ) -> DynamicsResult<i64> {
        self.insert_development_object(field_id, name, complex)
    }

    fn add_well(&mut self, field_id: i64, name: &str, fluid: FluidType) -> DynamicsResult<i64> {
        self.insert_well(field_id, name, fluid)
    }

    fn add_facts(&mut self, facts: &[NewFact]) -> DynamicsResult<usize> {
        self.insert_facts(facts)
    }
}

/// WHERE-clause fragments and their bound values for `spec`.
///
/// Fragments are joined with `AND`; placeholders are numbered so they stay
/// valid whatever order the fragments are joined in.
pub fn build_where_parts(spec: &FactFilterSpec) -> (Vec<String>, Vec<Value>) {
    let mut parts = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    params.push(Value::Text(spec.date_from.to_string()));
    params.push(Value::Text(spec.date_to.to_string()));
    parts.push(format!(
        "p.date BETWEEN ?{} AND ?{}",
        params.len() - 1,
        params.len()
    ));

    params.push(Value::Text(spec.fluid_type.as_str().to_string()));
    parts.push(format!("p.fluid_type = ?{}", params.len()));

    if let Some(ids) = &spec.field_ids {
        let placeholders: Vec<String> = ids
            .iter()
            .map(|id| {
                params.push(Value::Integer(*id));
                format!("?{}", params.len())
            })
            .collect();
        parts.push(format!("p.field_id IN ({})", placeholders.join(", ")));
    }

    // Complexes live on development objects, not on facts.
    if let Some(complexes) = &spec.deposit_complexes {
        let placeholders: Vec<String> = complexes
            .iter()
            .map(|c| {
                params.push(Value::Text(c.as_str().to_string()));
                format!("?{}", params.len())
            })
            .collect();
        parts.push(format!(
            "p.development_object_id IN (SELECT id FROM development_objects \
             WHERE deposit_complex IN ({}))",
            placeholders.join(", ")
        ));
    }

    (parts, params)
}

fn insert_fact_row(conn: &Connection, fact: &NewFact) -> DynamicsResult<()> {
    conn.execute(
        "INSERT INTO production
             (well_id, field_id, development_object_id, fluid_type, date, amount_milli, unit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            fact.well_id,
            fact.field_id,
            fact.development_object_id,
            fact.fluid_type.as_str(),
            fact.date,
            fact.amount.milli(),
            fact.unit,
        ],
    )?;
    Ok(())
}

fn decode_fact(row: &Row<'_>) -> rusqlite::Result<ProductionFact> {
    let milli: i64 = row.get(5)?;
    let amount = Amount::from_milli(milli)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, Box::new(e)))?;
    Ok(ProductionFact {
        field_id: row.get(0)?,
        field_name: row.get(1)?,
        development_object_id: row.get(2)?,
        fluid_type: parse_column::<FluidType>(row, 3)?,
        date: row.get(4)?,
        amount,
        unit: row.get(6)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
