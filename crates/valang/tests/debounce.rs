//! Event-driven validation timing, run on a paused tokio clock
#![cfg(feature = "events")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;
use valang::*;

type Calls = Arc<Mutex<Vec<(String, bool)>>>;

fn trigger_with(config: ValangConfig) -> (EventTrigger<HtmlForm>, HtmlForm, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let form = HtmlForm::new("signup")
        .with_field(FormField::text("name", ""))
        .with_field(FormField::text("email", "a@b.com"))
        .with_field(FormField::submit("save", "Save"));
    let rules = vec![
        Rule::new("name", Predicate::HasText(Expression::field("name")), "name is required"),
        Rule::new("email", Predicate::IsValidEmail(Expression::field("email")), "bad email"),
    ];
    let validator = ValangValidator::new("signup", form.clone(), rules)
        .with_config(config)
        .on_field_validated(move |field: &str, valid: bool, _: usize| {
            recorded.lock().unwrap().push((field.to_string(), valid));
        });
    (EventTrigger::new(validator), form, calls)
}

fn trigger() -> (EventTrigger<HtmlForm>, HtmlForm, Calls) {
    trigger_with(ValangConfig::default())
}

fn count(calls: &Calls) -> usize {
    calls.lock().unwrap().len()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_burst_of_events_validates_once() {
    let (trigger, _form, calls) = trigger();

    assert!(trigger.fire("name", FieldEvent::Blur));
    assert!(trigger.fire("name", FieldEvent::Change));
    assert!(trigger.fire("name", FieldEvent::Blur));
    assert_eq!(trigger.pending(), vec!["name".to_string()]);

    sleep(Duration::from_millis(20)).await;
    assert_eq!(*calls.lock().unwrap(), vec![("name".to_string(), false)]);
    assert!(trigger.pending().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_keystrokes_wait_longer_than_blur() {
    let (trigger, form, calls) = trigger();

    trigger.fire("name", FieldEvent::KeyUp);
    trigger.fire("email", FieldEvent::Blur);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(*calls.lock().unwrap(), vec![("email".to_string(), true)]);
    assert_eq!(trigger.pending(), vec!["name".to_string()]);

    // typing continues, the timer restarts and sees the latest value
    form.set_value("name", "Ada");
    trigger.fire("name", FieldEvent::KeyDown);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(count(&calls), 1);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(count(&calls), 2);
    assert_eq!(calls.lock().unwrap()[1], ("name".to_string(), true));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_validate_now_cancels_pending_timer() {
    let (trigger, _form, calls) = trigger();

    trigger.fire("name", FieldEvent::KeyUp);
    assert!(!trigger.validate_now("name"));
    assert!(trigger.pending().is_empty());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&calls), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_submit_cancels_every_timer() {
    let (trigger, form, calls) = trigger();

    trigger.fire("name", FieldEvent::KeyUp);
    trigger.fire("email", FieldEvent::Blur);
    form.set_value("name", "Ada");
    assert!(trigger.submit());
    assert!(trigger.pending().is_empty());

    sleep(Duration::from_secs(1)).await;
    // whole-form validation does not report per field
    assert_eq!(count(&calls), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_unbound_fields_are_ignored() {
    let (trigger, _form, calls) = trigger();

    assert!(!trigger.fire("ghost", FieldEvent::Blur));
    assert!(!trigger.fire("save", FieldEvent::Blur));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(count(&calls), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_disabled_events_do_not_schedule() {
    let mut config = ValangConfig::default();
    config.events.validate_on_key = false;
    config.events.debounce_ms = 50;
    let (trigger, _form, calls) = trigger_with(config);

    assert!(!trigger.fire("name", FieldEvent::KeyUp));
    assert!(trigger.fire("name", FieldEvent::Blur));

    sleep(Duration::from_millis(40)).await;
    assert_eq!(count(&calls), 0);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(count(&calls), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_inspect_sees_validator_and_keeps_timers() {
    let (trigger, _form, calls) = trigger();
    trigger.fire("name", FieldEvent::KeyUp);

    let bound = trigger.inspect(|validator| validator.bound_fields().to_vec());
    assert_eq!(bound, ["name".to_string(), "email".to_string()]);
    assert_eq!(trigger.pending(), vec!["name".to_string()]);

    sleep(Duration::from_millis(300)).await;
    assert_eq!(count(&calls), 1);
}
