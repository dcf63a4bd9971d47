use strand::time;
use strand::{Args, Co, Error, EventLoop, Outcome, Suspension, Value};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const PROTOCOL_MESSAGE: &str = "Multiple continuations within one step";

#[test]
fn test_manual_continuation_resumes_routine() {
    let routine = strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        time::set_timeout(Duration::from_millis(1), move || next.resolve(5))?;

        let v = co.wait().await?.expect_int()?;
        Ok::<_, Error>(v + 1)
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from(6)));
}

#[test]
fn test_manual_rejection_is_injected() {
    let routine = strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        time::set_timeout(Duration::ZERO, move || next.reject(Error::msg("manual")))?;

        co.wait().await
    });

    assert_eq!(strand::block_on(routine, ()), Err(Error::msg("manual")));
}

#[test]
fn test_resumption_is_deferred() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    let routine = strand::routine(move |co: Co, _args: Args| {
        let log = sink.clone();
        async move {
            let thunk_log = log.clone();
            co.suspend(Suspension::thunk(move |next| {
                next.resolve(());
                thunk_log.borrow_mut().push("continuation returned");
            }))
            .await?;

            log.borrow_mut().push("routine resumed");
            Ok::<_, Error>(())
        }
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::Null));
    assert_eq!(*log.borrow(), vec!["continuation returned", "routine resumed"]);
}

#[test]
fn test_double_invocation_fails_with_protocol_error() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Suspension::thunk(|next| {
            next.resolve(1);
            next.resolve(2);
        }))
        .await
    });

    let err = strand::block_on(routine, ()).unwrap_err();
    assert_eq!(err, Error::MultipleContinuations);
    assert_eq!(err.to_string(), PROTOCOL_MESSAGE);
}

#[test]
fn test_double_invocation_in_reverse_order_after_delay() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Suspension::thunk(|next| {
            let _ = time::set_timeout(Duration::from_millis(2), move || {
                next.reject(Error::msg("first"));
                next.resolve("second");
            });
        }))
        .await
    });

    assert_eq!(
        strand::block_on(routine, ()),
        Err(Error::MultipleContinuations)
    );
}

#[test]
fn test_late_second_call_after_routine_moved_on() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        let first = co
            .suspend(Suspension::thunk(|next| {
                next.resolve(1);
                let _ = time::set_timeout(Duration::from_millis(5), move || {
                    next.resolve("late")
                });
            }))
            .await?;

        let second = co.suspend(time::sleep(Duration::from_millis(30))).await?;
        Ok::<_, Error>(Value::List(vec![first, second]))
    });

    assert_eq!(
        strand::block_on(routine, ()),
        Err(Error::MultipleContinuations)
    );
}

#[test]
fn test_late_call_reversed_after_recovered_rejection() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    let routine = strand::routine(move |co: Co, _args: Args| {
        let log = sink.clone();
        async move {
            let failed = co
                .suspend(Suspension::thunk(|next| {
                    let _ = time::set_timeout(Duration::from_millis(2), move || {
                        next.reject(Error::msg("first"));
                        let _ = time::set_timeout(Duration::from_millis(5), move || {
                            next.resolve("second")
                        });
                    });
                }))
                .await
                .is_err();
            log.borrow_mut().push(failed);

            co.suspend(time::sleep(Duration::from_millis(30))).await?;
            log.borrow_mut().push(false);
            Ok::<_, Error>("finished")
        }
    });

    assert_eq!(
        strand::block_on(routine, ()),
        Err(Error::MultipleContinuations)
    );
    assert_eq!(*log.borrow(), vec![true]);
}

#[test]
fn test_argument_handle_serves_every_step() {
    let routine = strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");

        let first = next.clone();
        time::set_timeout(Duration::ZERO, move || first.resolve(1))?;
        let a = co.wait().await?.expect_int()?;

        time::set_timeout(Duration::from_millis(2), move || next.resolve(2))?;
        let b = co.wait().await?.expect_int()?;

        Ok::<_, Error>(a + b)
    });

    assert_eq!(strand::block_on(routine, ()), Ok(Value::from(3)));
}

#[test]
fn test_protocol_error_is_not_recoverable() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();

    let routine = strand::routine(move |co: Co, args: Args| {
        let log = sink.clone();
        async move {
            let next = args.next().expect("continuation attached");
            next.resolve(1);
            next.resolve(2);

            let recovered = co.wait().await.is_err();
            log.borrow_mut().push(recovered);
            Ok::<_, Error>("recovered")
        }
    });

    assert_eq!(
        strand::block_on(routine, ()),
        Err(Error::MultipleContinuations)
    );
    assert!(log.borrow().is_empty());
}

#[test]
fn test_protocol_error_settles_returned_promise() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Suspension::thunk(|next| {
            next.resolve(1);
            next.resolve(2);
        }))
        .await
    });

    let event_loop = EventLoop::new();
    let launch = event_loop
        .block_on(|| strand::run(routine, ()))
        .expect("loop ran")
        .expect("routine started");

    let promise = launch.into_promise().expect("promise mode");
    assert_eq!(promise.peek(), Some(Err(Error::MultipleContinuations)));
}

#[test]
fn test_protocol_error_escapes_unobserved_run() {
    let routine = strand::routine(|co: Co, _args: Args| async move {
        co.suspend(Suspension::thunk(|next| {
            next.resolve(1);
            next.resolve(2);
        }))
        .await
    });

    let event_loop = EventLoop::new();
    event_loop
        .enter(|| strand::spawn(routine, ()))
        .expect("violation is reported later");

    let err = event_loop.run().unwrap_err();
    assert!(err.is_protocol_violation());
    assert!(matches!(err, Error::Unobserved(_)));
}

#[test]
fn test_continuation_after_completion_is_ignored() {
    let outcomes: Rc<RefCell<Vec<Outcome>>> = Rc::default();
    let sink = outcomes.clone();

    let routine = strand::routine(|_co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        time::set_timeout(Duration::ZERO, move || {
            next.resolve("late");
            next.resolve("later");
        })?;

        Ok::<_, Error>("done")
    });

    let event_loop = EventLoop::new();
    event_loop
        .block_on(|| {
            strand::run_with(routine, (), move |outcome: Outcome| {
                sink.borrow_mut().push(outcome)
            })
        })
        .expect("loop ran")
        .expect("routine started");

    assert_eq!(*outcomes.borrow(), vec![Ok(Value::from("done"))]);
}

#[test]
fn test_receiver_is_visible_through_continuation() {
    let routine = strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        let bound = next
            .receiver()
            .and_then(|r| r.downcast_ref::<String>())
            .cloned()
            .unwrap_or_default();

        co.suspend(Suspension::thunk(move |next| next.resolve(bound)))
            .await
    });

    let args = Args::new().with_receiver(Rc::new("self".to_string()));
    assert_eq!(strand::block_on(routine, args), Ok(Value::from("self")));
}
