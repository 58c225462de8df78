use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pg_bulk_transfer::sink::LineSink;
use pg_bulk_transfer::source::RowSource;
use pg_bulk_transfer::{
    EncodeError, FieldValue, Phase, RecordEncoder, Row, TransferError, TransferResult, pump_rows,
};

/// Shared view of what happened on both ends of the pump.
#[derive(Default)]
struct Ledger {
    produced: Cell<u64>,
    written: Cell<u64>,
    max_in_flight: Cell<u64>,
    lines: RefCell<Vec<Vec<u8>>>,
    finished: Cell<bool>,
    aborted: RefCell<Option<String>>,
}

/// Generates rows lazily; optionally fails or emits a malformed row.
struct GeneratedRows {
    ledger: Rc<Ledger>,
    total: u64,
    next: u64,
    fail_at: Option<u64>,
    short_row_at: Option<u64>,
}

impl GeneratedRows {
    fn new(ledger: Rc<Ledger>, total: u64) -> Self {
        Self {
            ledger,
            total,
            next: 0,
            fail_at: None,
            short_row_at: None,
        }
    }
}

impl RowSource for GeneratedRows {
    async fn next_row(&mut self) -> TransferResult<Option<Row>> {
        if self.next == self.total {
            return Ok(None);
        }
        self.next += 1;
        if self.fail_at == Some(self.next) {
            self.total = self.next;
            return Err(TransferError::read(
                "generated",
                sqlx::Error::Protocol("cursor lost".to_string()),
            ));
        }

        let produced = self.ledger.produced.get() + 1;
        self.ledger.produced.set(produced);
        let in_flight = produced - self.ledger.written.get();
        if in_flight > self.ledger.max_in_flight.get() {
            self.ledger.max_in_flight.set(in_flight);
        }

        let id = self.next as i64;
        if self.short_row_at == Some(self.next) {
            return Ok(Some(Row::new(vec![FieldValue::Integer(id)])));
        }
        Ok(Some(Row::new(vec![
            FieldValue::Integer(id),
            FieldValue::Text(format!("row {id}")),
            FieldValue::Boolean(id % 2 == 0),
        ])))
    }
}

struct RecordingSink {
    ledger: Rc<Ledger>,
    keep_lines: bool,
}

impl LineSink for RecordingSink {
    async fn write_line(&mut self, line: &[u8]) -> TransferResult<()> {
        self.ledger.written.set(self.ledger.written.get() + 1);
        if self.keep_lines {
            self.ledger.lines.borrow_mut().push(line.to_vec());
        }
        Ok(())
    }

    async fn finish(self) -> TransferResult<u64> {
        self.ledger.finished.set(true);
        Ok(self.ledger.written.get())
    }

    async fn abort(self, reason: &str) {
        *self.ledger.aborted.borrow_mut() = Some(reason.to_string());
    }
}

fn sink(ledger: &Rc<Ledger>, keep_lines: bool) -> RecordingSink {
    RecordingSink {
        ledger: Rc::clone(ledger),
        keep_lines,
    }
}

#[tokio::test]
async fn rows_are_streamed_one_at_a_time() {
    let ledger = Rc::new(Ledger::default());
    let mut source = GeneratedRows::new(Rc::clone(&ledger), 100_000);
    let encoder = RecordEncoder::new(3);

    let stats = pump_rows("generated", &mut source, &encoder, sink(&ledger, false))
        .await
        .expect("pump succeeds");

    assert_eq!(stats.rows, 100_000);
    assert_eq!(ledger.written.get(), 100_000);
    assert!(ledger.finished.get());
    assert!(ledger.aborted.borrow().is_none());
    // The pump never pulls a row before the previous one reached the sink.
    assert_eq!(ledger.max_in_flight.get(), 1);
}

#[tokio::test]
async fn lines_reach_the_sink_in_source_order() {
    let ledger = Rc::new(Ledger::default());
    let mut source = GeneratedRows::new(Rc::clone(&ledger), 3);
    let encoder = RecordEncoder::new(3);

    let stats = pump_rows("generated", &mut source, &encoder, sink(&ledger, true))
        .await
        .expect("pump succeeds");

    let lines = ledger.lines.borrow();
    assert_eq!(
        *lines,
        vec![
            b"1,row 1,false\n".to_vec(),
            b"2,row 2,true\n".to_vec(),
            b"3,row 3,false\n".to_vec(),
        ]
    );
    let total: usize = lines.iter().map(Vec::len).sum();
    assert_eq!(stats.bytes, total as u64);
}

#[tokio::test]
async fn empty_source_still_finishes_the_sink() {
    let ledger = Rc::new(Ledger::default());
    let mut source = GeneratedRows::new(Rc::clone(&ledger), 0);
    let encoder = RecordEncoder::new(3);

    let stats = pump_rows("generated", &mut source, &encoder, sink(&ledger, true))
        .await
        .expect("pump succeeds");

    assert_eq!(stats.rows, 0);
    assert_eq!(stats.bytes, 0);
    assert!(ledger.finished.get());
}

#[tokio::test]
async fn encode_failure_aborts_the_sink() {
    let ledger = Rc::new(Ledger::default());
    let mut source = GeneratedRows::new(Rc::clone(&ledger), 10);
    source.short_row_at = Some(4);
    let encoder = RecordEncoder::new(3);

    let err = pump_rows("generated", &mut source, &encoder, sink(&ledger, true))
        .await
        .expect_err("short row must fail");

    assert_eq!(err.phase(), Phase::Encode);
    match err {
        TransferError::Encode { table, row, source } => {
            assert_eq!(table, "generated");
            assert_eq!(row, 4);
            assert_eq!(
                source,
                EncodeError::FieldCount {
                    expected: 3,
                    actual: 1
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.lines.borrow().len(), 3);
    assert!(!ledger.finished.get());
    assert!(ledger.aborted.borrow().is_some());
}

#[tokio::test]
async fn read_failure_aborts_the_sink() {
    let ledger = Rc::new(Ledger::default());
    let mut source = GeneratedRows::new(Rc::clone(&ledger), 10);
    source.fail_at = Some(6);
    let encoder = RecordEncoder::new(3);

    let err = pump_rows("generated", &mut source, &encoder, sink(&ledger, false))
        .await
        .expect_err("read failure must propagate");

    assert_eq!(err.phase(), Phase::Read);
    assert_eq!(err.table(), Some("generated"));
    assert_eq!(ledger.written.get(), 5);
    assert!(!ledger.finished.get());
    let reason = ledger.aborted.borrow().clone().expect("sink aborted");
    assert!(reason.contains("cursor lost"));
}
