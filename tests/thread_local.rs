mod common;

use std::sync::Arc;
use std::thread;

use attrgate::{context, AttrError, DatabaseConfig, Predicate, Quantifier, ScopedAttr, ScopedQuery, Value};
use common::RecordingObserver;

fn emit_at_verbosity(min: i64) -> ScopedQuery {
    ScopedQuery::when(Predicate::greater_or_equal("verbosity", min, Quantifier::Any)).unwrap()
}

#[test]
fn threads_own_independent_databases() {
    let _verbosity = ScopedAttr::replace("verbosity", 1);
    let _gate = emit_at_verbosity(2);
    assert!(!context::query().unwrap());

    let worker = thread::spawn(|| {
        // Fresh database: nothing bound, no gate.
        let before = context::query().unwrap();
        let _verbosity = ScopedAttr::replace("verbosity", 5);
        let _gate = emit_at_verbosity(2);
        (before, context::query().unwrap())
    });
    assert_eq!(worker.join().unwrap(), (true, true));

    assert!(!context::query().unwrap());
    assert!(context::with(|db| db.get("verbosity").contains(&Value::from(1))));
}

#[test]
fn scoped_handles_restore_on_early_return() {
    fn work(fail: bool) -> Result<(), &'static str> {
        let _phase = ScopedAttr::replace("phase", "solve");
        let _gate = ScopedQuery::and(Predicate::equal("phase", "solve", Quantifier::Any)).unwrap();
        if fail {
            return Err("diverged");
        }
        Ok(())
    }

    context::with(|db| db.replace("phase", "setup"));
    assert!(work(true).is_err());
    assert_eq!(context::with(|db| db.depth()), 0);
    assert!(context::with(|db| db.get("phase").contains(&Value::from("setup"))));
    assert!(work(false).is_ok());
}

#[test]
fn scoped_handles_restore_while_unwinding() {
    let result = thread::spawn(|| {
        let outcome = std::panic::catch_unwind(|| {
            let _level = ScopedAttr::add("level", 4);
            let _gate = ScopedQuery::never().unwrap();
            panic!("instrumented code failed");
        });
        assert!(outcome.is_err());
        (context::with(|db| db.depth()), context::with(|db| db.exists("level")))
    })
    .join()
    .unwrap();
    assert_eq!(result, (0, false));
}

#[test]
fn additive_handles_stack() {
    let _a = ScopedAttr::add("tag", "mesh");
    {
        let _b = ScopedAttr::add("tag", "solver");
        assert_eq!(context::with(|db| db.get("tag").len()), 2);
        assert!(context::query_block(Some(&Predicate::equal("tag", "solver", Quantifier::Any))).unwrap());
    }
    assert_eq!(context::with(|db| db.get("tag").len()), 1);
    assert!(!context::query_block(Some(&Predicate::equal("tag", "solver", Quantifier::Any))).unwrap());
}

#[test]
fn install_applies_configuration() {
    context::install(DatabaseConfig::default().with_max_chain_depth(1)).unwrap();
    let _first = ScopedQuery::always().unwrap();
    assert!(ScopedQuery::always().is_err());
}

#[test]
fn observers_on_thread_database() {
    let recorder = Arc::new(RecordingObserver::default());
    let token = context::with(|db| db.add_observer("k", recorder.clone()));
    {
        let _k = ScopedAttr::replace("k", 1);
    }
    assert_eq!(recorder.calls(), 4);
    context::with(|db| db.remove_observer(token)).unwrap();
}

#[test]
fn reset_waits_for_live_attribute_handles() {
    let outcome = thread::spawn(|| {
        context::with(|db| db.replace("mode", "batch"));
        let interactive = ScopedAttr::replace("mode", "interactive");
        let refused = context::reset();
        drop(interactive);
        let restored = context::with(|db| db.get("mode").contains(&Value::from("batch")));
        context::reset().unwrap();
        (refused, restored, context::with(|db| db.exists("mode")))
    })
    .join()
    .unwrap();
    assert_eq!(
        outcome,
        (
            Err(AttrError::ScopesActive {
                queries: 0,
                bindings: 1
            }),
            true,
            false
        )
    );
}
