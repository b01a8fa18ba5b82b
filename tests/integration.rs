//! Integration tests for rxstream
//!
//! Tests operator chains, multicast behaviour, cancellation and threading.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  thread,
  time::Duration,
};

use futures::StreamExt;
use rxstream::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Construction
// ============================================================================

#[test]
fn just_yields_subscribe_next_complete() {
  let test = TestSubscriber::new();
  just(42).subscribe(Box::new(test.clone()));
  assert_eq!(test.events(), vec![Event::Subscribe, Event::Next(42), Event::Complete]);
}

#[test]
fn concat_keeps_source_order() {
  let test = TestSubscriber::new();
  concat(vec![just(1).box_it(), just(2).box_it()]).subscribe(Box::new(test.clone()));
  assert_eq!(test.events(), vec![
    Event::Subscribe,
    Event::Next(1),
    Event::Next(2),
    Event::Complete
  ]);
}

#[test]
fn concat_waits_for_async_source() {
  let first = PublishSubject::new();
  let test = TestSubscriber::new();
  first.clone().concat_with(just(2)).subscribe(Box::new(test.clone()));
  assert!(test.items().is_empty());
  first.next(1);
  first.complete();
  assert_eq!(test.items(), vec![1, 2]);
  assert!(test.is_completed());
}

#[test]
fn merge_completes_once_after_both() {
  let test = TestSubscriber::new();
  merge(vec![just(1).box_it(), just(2).box_it()]).subscribe(Box::new(test.clone()));
  let mut items = test.items();
  items.sort();
  assert_eq!(items, vec![1, 2]);
  assert_eq!(test.terminal_count(), 1);
  assert_eq!(test.events().last(), Some(&Event::Complete));
}

#[test]
fn cancelling_a_merge_stops_every_source() {
  let a = PublishSubject::new();
  let b = PublishSubject::new();
  let test = TestSubscriber::new();
  a.clone().merge_with(b.clone()).subscribe(Box::new(test.clone()));
  a.next(1);
  test.cancel();
  a.next(2);
  b.next(3);
  assert_eq!(test.items(), vec![1]);
  assert!(!a.has_subscriber());
  assert!(!b.has_subscriber());
}

// ============================================================================
// Transformation
// ============================================================================

#[test]
fn panicking_map_is_an_error_without_items() {
  let test = TestSubscriber::<i32>::new();
  just(5).map(|_| -> i32 { panic!("boom") }).subscribe(Box::new(test.clone()));
  assert!(test.items().is_empty());
  let errors = test.errors();
  assert_eq!(errors.len(), 1);
  assert!(errors[0].is_transform());
  assert!(errors[0].to_string().contains("boom"));
}

#[test]
fn flat_map_completes_after_every_inner() {
  let test = TestSubscriber::new();
  from_iter(vec![1, 2]).flat_map(|v| just(v * 10)).subscribe(Box::new(test.clone()));
  assert_eq!(test.items(), vec![10, 20]);
  assert_eq!(test.terminal_count(), 1);
  assert_eq!(test.events().last(), Some(&Event::Complete));
}

#[test]
fn flat_map_waits_for_open_inner() {
  let inner = PublishSubject::new();
  let c_inner = inner.clone();
  let test = TestSubscriber::new();
  just(()).flat_map(move |_| c_inner.clone()).subscribe(Box::new(test.clone()));
  assert!(!test.is_completed());
  inner.next("late");
  inner.complete();
  assert_eq!(test.items(), vec!["late"]);
  assert!(test.is_completed());
}

#[test]
fn chain_of_operators() {
  let items = from_iter(1..=10)
    .map(|x| x * 2)
    .filter(|x| *x > 10)
    .filter_map(|x| if x % 4 == 0 { Some(x / 4) } else { None })
    .block_for_result(WAIT)
    .unwrap();
  assert_eq!(items, vec![3, 4, 5]);
}

// ============================================================================
// Multicast
// ============================================================================

#[test]
fn share_and_replay_two_of_three() {
  let subject = PublishSubject::new();
  let shared = subject.clone().share_and_replay(2);
  shared.subscribe_next(|_| {});
  subject.next(1);
  subject.next(2);
  subject.next(3);

  let late = TestSubscriber::new();
  shared.subscribe(Box::new(late.clone()));
  subject.next(4);
  assert_eq!(late.items(), vec![2, 3, 4]);
}

#[test]
fn shared_callback_runs_once_for_many_subscribers() {
  let starts = Arc::new(AtomicUsize::new(0));
  let c_starts = starts.clone();
  let request = from_callback(move |done: Callback<&'static str>| {
    c_starts.fetch_add(1, Ordering::SeqCst);
    let (handle, _registration) = futures::future::AbortHandle::new_pair();
    done("payload");
    handle
  })
  .share_hot_and_replay(1);

  let a = TestSubscriber::new();
  let b = TestSubscriber::new();
  request.subscribe(Box::new(a.clone()));
  request.subscribe(Box::new(b.clone()));
  assert_eq!(starts.load(Ordering::SeqCst), 1);
  assert_eq!(a.items(), vec!["payload"]);
  assert_eq!(b.items(), vec!["payload"]);
  assert!(a.is_completed() && b.is_completed());
}

// ============================================================================
// Subjects and lifetimes
// ============================================================================

#[test]
fn publish_subject_refuses_second_subscriber() {
  let subject = PublishSubject::new();
  let first = TestSubscriber::new();
  let second = TestSubscriber::new();
  subject.subscribe(Box::new(first.clone()));
  subject.subscribe(Box::new(second.clone()));
  subject.next(1);
  assert_eq!(first.items(), vec![1]);
  assert_eq!(second.errors()[0].as_label(), "stream_already_subscribed");
}

#[test]
fn take_until_detaches_from_source() {
  let source = PublishSubject::new();
  let lifetime = PublishSubject::<()>::new();
  let seen = Arc::new(AtomicUsize::new(0));
  let c_seen = seen.clone();
  let test = TestSubscriber::new();
  source
    .clone()
    .do_on_next(move |_| {
      c_seen.fetch_add(1, Ordering::SeqCst);
    })
    .take_until(lifetime.clone())
    .subscribe(Box::new(test.clone()));

  source.next(1);
  lifetime.next(());
  source.next(2);
  assert_eq!(test.items(), vec![1]);
  assert_eq!(seen.load(Ordering::SeqCst), 1);
  assert!(!source.has_subscriber());
}

#[test]
fn lifecycle_hooks_fire_in_order() {
  let log = Arc::new(Mutex::new(vec![]));
  let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
  just(1)
    .do_on_subscribe(move || l1.lock().unwrap().push("subscribe"))
    .do_on_next(move |_| l2.lock().unwrap().push("next"))
    .do_on_unsubscribe(move || l3.lock().unwrap().push("unsubscribe"))
    .subscribe_next(|_| {});
  assert_eq!(*log.lock().unwrap(), vec!["subscribe", "next", "unsubscribe"]);
}

// ============================================================================
// Threading
// ============================================================================

#[test]
fn subscribe_on_and_observe_on_across_threads() {
  let caller = thread::current().id();
  let threads = Arc::new(Mutex::new(vec![]));
  let c_threads = threads.clone();
  let items = from_iter(0..50)
    .subscribe_on(NewThreadScheduler)
    .map(|v| v + 1)
    .observe_on(NewThreadScheduler)
    .do_on_next(move |_| c_threads.lock().unwrap().push(thread::current().id()))
    .block_for_result(WAIT)
    .unwrap();
  assert_eq!(items, (1..=50).collect::<Vec<_>>());
  assert!(threads.lock().unwrap().iter().all(|id| *id != caller));
}

#[test]
fn merge_of_threaded_sources() {
  let sources = (0..4)
    .map(|i| from_iter(i * 10..i * 10 + 10).subscribe_on(NewThreadScheduler).box_it())
    .collect();
  let mut items = merge(sources).block_for_result(WAIT).unwrap();
  items.sort();
  assert_eq!(items, (0..40).collect::<Vec<_>>());
}

// ============================================================================
// Async interop
// ============================================================================

#[tokio::test]
async fn stream_of_a_shared_publisher() {
  let shared = from_iter(vec![1, 2, 3]).share_and_replay_all();
  let collected: Vec<_> = shared.into_stream().collect().await;
  assert_eq!(collected.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn single_operation_awaited() {
  let value = NewThreadScheduler
    .schedule_operation(|| 21)
    .map(ImmediateScheduler, |v| v * 2)
    .into_future()
    .await
    .unwrap();
  assert_eq!(value, 42);
}
