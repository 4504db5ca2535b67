use chrono::NaiveDate;
use production_dynamics::dynamics::{Amount, DepositComplex, FluidType};
use production_dynamics::store::{FactSink, MemoryFactStore, NewFact, SqliteFactStore};

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

/// Ids handed out while writing the reference dataset.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub field_a: i64,
    pub field_b: i64,
}

/// Two gas fields, one gas well each, with monthly facts for 2021-2023:
/// A (Cenomanian) produces `1000 + 10*month`, B (Turonian) `800 + 8*month`.
#[allow(dead_code)]
pub fn write_reference<S: FactSink>(store: &mut S) -> Reference {
    let field_a = store.add_field("Field A", "Operator A").expect("field A");
    let field_b = store.add_field("Field B", "Operator B").expect("field B");
    let obj_a = store
        .add_development_object(field_a, "A - сеноман", DepositComplex::Cenomanian)
        .expect("object A");
    let obj_b = store
        .add_development_object(field_b, "B - турон", DepositComplex::Turonian)
        .expect("object B");
    let well_a = store
        .add_well(field_a, "A-001", FluidType::Gas)
        .expect("well A");
    let well_b = store
        .add_well(field_b, "B-001", FluidType::Gas)
        .expect("well B");

    let mut facts = Vec::new();
    for year in 2021..=2023 {
        for month in 1..=12u32 {
            for (field_id, object_id, well_id, base, step) in [
                (field_a, obj_a, well_a, 1000.0, 10.0),
                (field_b, obj_b, well_b, 800.0, 8.0),
            ] {
                facts.push(NewFact {
                    well_id: Some(well_id),
                    field_id,
                    development_object_id: object_id,
                    fluid_type: FluidType::Gas,
                    date: d(year, month, 1),
                    amount: Amount::from_f64(base + step * f64::from(month)).expect("amount"),
                    unit: "тыс. м³".into(),
                });
            }
        }
    }
    store.add_facts(&facts).expect("facts");
    Reference { field_a, field_b }
}

#[allow(dead_code)]
pub fn reference_sqlite() -> (SqliteFactStore, Reference) {
    let mut store = SqliteFactStore::open_in_memory().expect("open sqlite");
    let ids = write_reference(&mut store);
    (store, ids)
}

#[allow(dead_code)]
pub fn reference_memory() -> (MemoryFactStore, Reference) {
    let mut store = MemoryFactStore::new();
    let ids = write_reference(&mut store);
    (store, ids)
}
