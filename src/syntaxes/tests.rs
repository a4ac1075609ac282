use chrono::Duration;
use pretty_assertions::assert_eq;

use crate::api::{fire, load};
use crate::engine::ErrorKind;
use crate::lang::TriggerContext;
use crate::runtime::TickScheduler;
use crate::script::{FileElement, FileSection, SourceLine};
use crate::value::Value;

// --- Helpers --------------------------------------------------------------------

type ScriptLine<'a> = (usize, usize, &'a str);

fn elements(lines: &[ScriptLine<'_>], pos: &mut usize, indent: usize) -> Vec<FileElement> {
    let mut out = Vec::new();
    while let Some(&(number, depth, content)) = lines.get(*pos) {
        if depth < indent {
            break;
        }
        *pos += 1;
        let line = SourceLine::new("test.sk", number, content);
        if content.ends_with(':') {
            let body = match lines.get(*pos) {
                Some(&(_, inner, _)) if inner > depth => elements(lines, pos, inner),
                _ => Vec::new(),
            };
            out.push(FileElement::Section(FileSection::new(line, body)));
        } else {
            out.push(FileElement::Line(line));
        }
    }
    out
}

/// Build the section tree of an indented script. Line numbers start at the
/// first line after the opening newline.
fn script(text: &str) -> Vec<FileSection> {
    let text = text.strip_prefix('\n').unwrap_or(text);
    let lines: Vec<ScriptLine<'_>> = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l.len() - l.trim_start().len(), l.trim()))
        .collect();
    let base = lines.iter().map(|l| l.1).min().unwrap_or(0);
    let mut pos = 0;
    elements(&lines, &mut pos, base)
        .into_iter()
        .filter_map(|e| match e {
            FileElement::Section(section) => Some(section),
            FileElement::Line(_) => None,
        })
        .collect()
}

/// Load `text`, fire `ctx` and drive the scheduler until every firing is done.
fn run_with(text: &str, ctx: TriggerContext) -> Vec<String> {
    let out = load(&script(text)).unwrap();
    assert!(out.is_clean(), "{:#?}", out.diagnostics);

    let mut scheduler = TickScheduler::default();
    fire(&out.triggers, &ctx, &mut scheduler).unwrap();
    let mut done = scheduler.poll();
    for _ in 0..1_000 {
        if scheduler.pending() == 0 {
            break;
        }
        done.extend(scheduler.advance(1));
    }
    assert_eq!(scheduler.pending(), 0, "firings still parked");

    let mut output = Vec::new();
    for completion in done {
        completion.result.unwrap();
        output.extend(completion.executor.context().output().iter().cloned());
    }
    output
}

fn run(text: &str) -> Vec<String> {
    run_with(text, TriggerContext::new("load"))
}

fn errors(text: &str) -> Vec<(usize, ErrorKind, String)> {
    let out = load(&script(text)).unwrap();
    out.diagnostics.into_iter().map(|d| (d.line.map_or(0, |l| l.line), d.kind, d.message)).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// --- Effects and expressions ----------------------------------------------------

#[test]
fn print_set_and_variables() {
    let output = run(r#"
on load:
    set {x} to 5
    print {x}
    set {names::*} to "a", "b" and "c"
    print {names::*}
    print "x", {x} or "y"
    print {missing} otherwise "fallback"
"#);
    assert_eq!(output, strings(&["5", "a, b and c", "x, 5 or y", "fallback"]));
}

#[test]
fn expression_library() {
    // (expected output, expression)
    let cases: Vec<(&str, &str)> = vec![
        ("ff", "255 converted to hex"),
        ("377", "255 convert to octal"),
        ("101", "5 converted in binary"),
        ("-a", "-10 converted to hexadecimal"),
        ("5", "length of \"hello\""),
        ("3", "\"abc\"'s length"),
        ("0", "length of \"\""),
        ("fallback", "{nothing} otherwise \"fallback\""),
        ("7", "7 ? \"unused\""),
    ];
    for (expected, expression) in cases {
        let output = run(&format!("on load:\n    print {expression}\n"));
        assert_eq!(output, strings(&[expected]), "expression: {expression}");
    }
}

#[test]
fn random_numbers_stay_within_their_bounds() {
    let output = run(r#"
on load:
    loop 50 times:
        print a random integer between 1 and 6
        print random integer from 3 to 3
        print a strictly random integer between 3 and 1
        print a strictly random number between 0 and 1
        print random number between 2 and 2.5
"#);
    assert_eq!(output.len(), 250);
    for round in output.chunks(5) {
        let die: i64 = round[0].parse().unwrap();
        assert!((1..=6).contains(&die), "{die}");
        assert_eq!(round[1], "3");
        assert_eq!(round[2], "2");
        let open: f64 = round[3].parse().unwrap();
        assert!(open > 0.0 && open < 1.0, "{open}");
        let closed: f64 = round[4].parse().unwrap();
        assert!((2.0..=2.5).contains(&closed), "{closed}");
    }
}

#[test]
fn set_checks_its_target_and_arity() {
    let found = errors(
        r#"
on load:
    set {x} to 1, 2 and 3
    set "text" to 1
    set {list::*} to 1, 2 and 3
"#,
    );
    assert_eq!(
        found,
        vec![
            (2, ErrorKind::Semantic, "{x} can only be set to one value, not 1, 2 and 3".to_string()),
            (3, ErrorKind::Semantic, "\"text\" cannot be set to anything".to_string()),
        ]
    );
}

// --- Conditions -----------------------------------------------------------------

#[test]
fn condition_library() {
    // (holds, condition)
    let cases: Vec<(bool, &str)> = vec![
        (true, "\"abc123\" matches \"[a-z]+\\d+\""),
        (false, "\"abc\" matches \"\\d+\""),
        (false, "\"abc\" matches \"ab\""),
        (true, "\"abc\" doesn't match \"\\d+\""),
        (true, "\"abc\" matches regex \"a.c\""),
        (true, "2 is greater than 1"),
        (false, "2 is less than 1"),
        (true, "2 is not equal to 3"),
        (false, "2 is not equal to 2.0"),
        (true, "\"Hello\" is equal to \"hello\""),
        (true, "1, 2 and 3 are less than 4"),
        (false, "1, 2 and 5 are less than 4"),
        (true, "5, 2 or 1 are less than 2"),
        (true, "2 is equal to 1, 2 or 3"),
        (false, "2 is equal to 1, 2 and 3"),
        (true, "2 = 2"),
        (true, "3 > 2"),
        (false, "3 < 2"),
        (true, "3 != 2"),
        (false, "{unset} is equal to 1"),
        (true, "{unset} is not equal to 1"),
    ];
    for (holds, condition) in cases {
        let output = run(&format!("on load:\n    if {condition}:\n        print \"yes\"\n    else:\n        print \"no\"\n"));
        let expected = if holds { "yes" } else { "no" };
        assert_eq!(output, strings(&[expected]), "condition: {condition}");
    }
}

#[test]
fn invalid_literal_regex_is_reported() {
    let found = errors("on load:\n    continue if \"a\" matches \"(\"\n");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, 2);
    assert_eq!(found[0].1, ErrorKind::Semantic);
    assert!(found[0].2.starts_with("'(' is not a valid regex"), "{}", found[0].2);
}

// --- Conditional sections ---------------------------------------------------------

#[test]
fn if_else_chains() {
    // (value of {x}, branch taken)
    let cases: Vec<(i64, &str)> = vec![(1, "small"), (3, "medium"), (6, "medium"), (7, "large"), (100, "large")];
    for (value, branch) in cases {
        let output = run(&format!(
            r#"
on load:
    set {{x}} to {value}
    if {{x}} is less than 3:
        print "small"
    else if {{x}} is less than 7:
        print "medium"
    else:
        print "large"
    print "done"
"#
        ));
        assert_eq!(output, strings(&[branch, "done"]), "x = {value}");
    }
}

#[test]
fn only_the_first_true_branch_runs() {
    let output = run(r#"
on load:
    if 1 is equal to 1:
        print "first"
    else if 2 is equal to 2:
        print "second"
    else:
        print "third"
    if 1 is equal to 2:
        print "skipped"
    if 1 is equal to 1:
        print "separate chain"
"#);
    assert_eq!(output, strings(&["first", "separate chain"]));
}

#[test]
fn misplaced_else_is_reported() {
    let cases: Vec<(usize, &str, &str)> = vec![
        (
            3,
            "'else' has to be placed just after an 'if' or 'else if' section",
            r#"
on load:
    print "a"
    else:
        print "b"
"#,
        ),
        (
            5,
            "'else if' has to be placed just after another 'if' or 'else if' section",
            r#"
on load:
    if 1 is equal to 1:
        print "a"
    print "between"
    else if 1 is equal to 2:
        print "b"
"#,
        ),
        (
            6,
            "'else' has to be placed just after an 'if' or 'else if' section",
            r#"
on load:
    if 1 is equal to 1:
        print "a"
    else:
        print "b"
    else:
        print "c"
"#,
        ),
    ];
    for (line, message, text) in cases {
        assert_eq!(errors(text), vec![(line, ErrorKind::Semantic, message.to_string())]);
    }
}

#[test]
fn continue_if_and_stop_end_the_firing() {
    // (statement between the two prints, output)
    let cases: Vec<(&str, Vec<&str>)> = vec![
        ("continue if 1 is equal to 1", vec!["a", "b"]),
        ("continue if 1 is equal to 2", vec!["a"]),
        ("continue if {flag} is equal to true", vec!["a"]),
        ("stop", vec!["a"]),
        ("exit trigger", vec!["a"]),
        ("stop the trigger", vec!["a"]),
    ];
    for (statement, expected) in cases {
        let output = run(&format!("on load:\n    print \"a\"\n    {statement}\n    print \"b\"\n"));
        assert_eq!(output, strings(&expected), "statement: {statement}");
    }
}

#[test]
fn continue_if_takes_conditions_only() {
    let cases: Vec<(&str, &str)> = vec![
        ("continue if true", "'true' is a constant and cannot be used as a condition"),
        ("continue if {flag}", "{flag} is a variable and cannot be used as a condition"),
    ];
    for (statement, message) in cases {
        assert_eq!(
            errors(&format!("on load:\n    {statement}\n")),
            vec![(2, ErrorKind::Semantic, message.to_string())],
            "statement: {statement}"
        );
    }
}

// --- Loops ------------------------------------------------------------------------

#[test]
fn while_repeats_until_its_condition_fails() {
    let output = run(r#"
on load:
    set {go} to true
    while {go} is equal to true:
        print "once"
        set {go} to false
    while 1 is equal to 2:
        print "never"
    print "after"
"#);
    assert_eq!(output, strings(&["once", "after"]));
}

#[test]
fn loop_times_counts_iterations() {
    let cases: Vec<(&str, Vec<&str>)> = vec![
        ("3", vec!["1", "2", "3", "done"]),
        ("1", vec!["1", "done"]),
        ("0", vec!["done"]),
    ];
    for (times, expected) in cases {
        let output = run(&format!("on load:\n    loop {times} times:\n        print loop-number\n    print \"done\"\n"));
        assert_eq!(output, strings(&expected), "loop {times} times");
    }
}

#[test]
fn nested_loops_number_the_innermost() {
    let output = run(r#"
on load:
    loop 2 times:
        print "outer"
        loop 2 time:
            print loop-counter
"#);
    assert_eq!(output, strings(&["outer", "1", "2", "outer", "1", "2"]));
}

#[test]
fn loop_number_outside_a_loop_is_reported() {
    assert_eq!(
        errors("on load:\n    print loop-number\n"),
        vec![(2, ErrorKind::Semantic, "loop-number can only be used inside a loop".to_string())]
    );
}

// --- Switch -----------------------------------------------------------------------

#[test]
fn switch_runs_the_first_matching_case() {
    let cases: Vec<(&str, Vec<&str>)> = vec![
        ("1", vec!["one", "after"]),
        ("2", vec!["two or three", "after"]),
        ("3", vec!["two or three", "after"]),
        ("\"four\"", vec!["four", "after"]),
        ("9", vec!["other", "after"]),
    ];
    for (value, expected) in cases {
        let output = run(&format!(
            r#"
on load:
    switch {value}:
        case 1:
            print "one"
        case 2 or 3:
            print "two or three"
        when "FOUR":
            print "four"
        default:
            print "other"
    print "after"
"#
        ));
        assert_eq!(output, strings(&expected), "switch {value}");
    }
}

#[test]
fn switch_without_a_match_runs_nothing() {
    let output = run(r#"
on load:
    set {x} to 5
    switch {x}:
        case 1:
            print "one"
    print "after"
"#);
    assert_eq!(output, strings(&["after"]));
}

#[test]
fn switch_bodies_only_take_cases() {
    let found = errors(
        r#"
on load:
    switch 1:
        print "x"
        case 1:
            print "one"
    case 2:
        print "two"
"#,
    );
    assert_eq!(
        found,
        vec![
            (3, ErrorKind::Semantic, "print cannot be used here".to_string()),
            (6, ErrorKind::Semantic, "case can only be used directly inside a switch".to_string()),
        ]
    );
}

#[test]
fn cases_take_or_lists_and_one_trailing_default() {
    let found = errors(
        r#"
on load:
    switch 1:
        case 1 and 2:
            print "both"
        default:
            print "other"
        otherwise:
            print "another"
        case 3:
            print "three"
"#,
    );
    assert_eq!(
        found,
        vec![
            (3, ErrorKind::Semantic, "only 'or'-lists may be used, found '1 and 2'".to_string()),
            (7, ErrorKind::Semantic, "a switch can only have one default case".to_string()),
            (9, ErrorKind::Semantic, "a case cannot be placed after the default case".to_string()),
        ]
    );
}

// --- Waiting and events -------------------------------------------------------------

#[test]
fn wait_parks_the_firing_for_its_timespan() {
    let out = load(&script(
        r#"
on load:
    print "before"
    wait 3 ticks
    print "after"
"#,
    ))
    .unwrap();
    assert!(out.is_clean(), "{:#?}", out.diagnostics);

    let mut scheduler = TickScheduler::default();
    fire(&out.triggers, &TriggerContext::new("load"), &mut scheduler).unwrap();
    assert!(scheduler.poll().is_empty());
    assert_eq!(scheduler.pending(), 1);
    assert!(scheduler.advance(2).is_empty());

    let done = scheduler.advance(1);
    assert_eq!(scheduler.elapsed(), Duration::milliseconds(150));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].result, Ok(()));
    assert_eq!(done[0].executor.context().output(), &strings(&["before", "after"])[..]);
}

#[test]
fn waits_inside_loops_resume_the_loop() {
    let out = load(&script("on load:\n    loop 2 times:\n        print loop-number\n        wait a tick\n")).unwrap();
    assert!(out.is_clean(), "{:#?}", out.diagnostics);

    let mut scheduler = TickScheduler::default();
    fire(&out.triggers, &TriggerContext::new("load"), &mut scheduler).unwrap();
    assert!(scheduler.poll().is_empty());
    assert!(scheduler.advance(1).is_empty());
    let done = scheduler.advance(1);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].executor.context().output(), &strings(&["1", "2"])[..]);
}

#[test]
fn cancelled_firings_never_resume() {
    let out = load(&script("on load:\n    wait 1 second\n    print \"late\"\n")).unwrap();
    let mut scheduler = TickScheduler::default();
    let ids = fire(&out.triggers, &TriggerContext::new("load"), &mut scheduler).unwrap();
    assert!(scheduler.poll().is_empty());

    let cancelled = scheduler.cancel(ids[0]).unwrap();
    assert!(cancelled.is_started());
    assert!(!cancelled.is_finished());
    assert!(scheduler.advance(100).is_empty());
    assert!(cancelled.context().output().is_empty());
}

#[test]
fn command_events_match_their_name() {
    let text = r#"
on command "greet":
    print "hello"
command "wave":
    print "waving"
"#;
    // (invoked command, output)
    let cases: Vec<(&str, Vec<&str>)> =
        vec![("greet", vec!["hello"]), ("GREET", vec!["hello"]), ("wave", vec!["waving"]), ("dance", vec![])];
    for (command, expected) in cases {
        let ctx = TriggerContext::new("command").with_arguments(vec![Value::Text(command.to_string())]);
        assert_eq!(run_with(text, ctx), strings(&expected), "command {command}");
    }
    assert!(run(text).is_empty());
}

#[test]
fn command_names_must_be_literal() {
    let found = errors("on command {name}:\n    print \"x\"\n");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, 1);
}
