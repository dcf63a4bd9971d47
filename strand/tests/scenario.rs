use strand::time;
use strand::{Args, Co, Error, EventLoop, Outcome, RoutineFn, Value};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Waits on a zero-delay timer through the continuation, then returns 1044.
fn v1() -> RoutineFn {
    strand::routine(|co: Co, args: Args| async move {
        let next = args.next().expect("continuation attached");
        time::set_timeout(Duration::ZERO, move || next.resolve(()))?;
        co.wait().await?;

        Ok::<_, Error>(1044)
    })
}

fn v() -> RoutineFn {
    strand::routine(|_co: Co, _args: Args| async move { Ok::<_, Error>(167) })
}

/// Returns the routine `v` itself, resolved as the final step.
fn v2() -> RoutineFn {
    strand::routine(|_co: Co, _args: Args| async move { Ok::<_, Error>(v()) })
}

fn f() -> RoutineFn {
    strand::routine(|co: Co, args: Args| async move {
        let prefix = args.value(0).map(Value::to_string).unwrap_or_default();

        let a = co.suspend(v1()).await?.expect_int()?;
        let b = co.suspend(v2()).await?.expect_int()?;

        Ok::<_, Error>(format!("{prefix}{}", a / 2 + b))
    })
}

#[test]
fn test_scenario_with_terminal_callback() {
    let outcome: Rc<RefCell<Option<Outcome>>> = Rc::default();
    let sink = outcome.clone();

    let event_loop = EventLoop::new();
    event_loop
        .block_on(|| {
            strand::run_with(f(), ["D7"], move |result: Outcome| {
                *sink.borrow_mut() = Some(result);
            })
        })
        .expect("loop ran")
        .expect("routine started");

    assert_eq!(outcome.take(), Some(Ok(Value::from("D7689"))));
}

#[test]
fn test_scenario_with_returned_promise() {
    let event_loop = EventLoop::new();
    let launch = event_loop
        .block_on(|| strand::run(f(), ["DLM"]))
        .expect("loop ran")
        .expect("routine started");

    let promise = launch.into_promise().expect("promise mode");
    assert_eq!(promise.peek(), Some(Ok(Value::from("DLM689"))));
}

#[test]
fn test_scenario_through_block_on() {
    assert_eq!(strand::block_on(f(), ["X"]), Ok(Value::from("X689")));
}
