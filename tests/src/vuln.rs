#![cfg(test)]

use std::fs;

use redops_backends::gmp::{ReportFormat, ReportRecord, ScanConfig, TargetRecord, TaskRecord};
use redops_common::Error;
use redops_core::vuln::VulnEngine;

use crate::support::FakeVuln;

fn engine() -> (VulnEngine<FakeVuln>, FakeVuln) {
    let client = FakeVuln::default();
    (VulnEngine::new(client.clone()), client)
}

fn stock_configs() -> Vec<ScanConfig> {
    vec![
        ScanConfig {
            id: "cfg-full".to_string(),
            name: "Full and fast".to_string(),
        },
        ScanConfig {
            id: "cfg-system".to_string(),
            name: "System Discovery".to_string(),
        },
        ScanConfig {
            id: "cfg-host".to_string(),
            name: "Host Discovery".to_string(),
        },
    ]
}

fn one_target() -> Vec<TargetRecord> {
    vec![TargetRecord {
        id: "tgt-1".to_string(),
        hosts: "192.0.2.9".to_string(),
    }]
}

#[test]
fn listing_configs_returns_names_and_refreshes_the_index() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().configs = stock_configs();

    let names = engine.list_configs().unwrap();
    assert_eq!(
        names,
        vec!["Full and fast", "System Discovery", "Host Discovery"]
    );
}

#[test]
fn every_operation_is_wrapped_in_open_and_close() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().configs = stock_configs();

    engine.list_configs().unwrap();

    let state = client.state.borrow();
    assert_eq!(state.opens.len(), 1);
    assert_eq!(state.closes, 1);
    assert!(!state.open);
}

#[test]
fn close_runs_even_when_the_operation_fails() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().fail_list_tasks = true;

    assert!(engine.tasks().is_err());

    let state = client.state.borrow();
    assert_eq!(state.opens.len(), 1);
    assert_eq!(state.closes, 1);
    assert!(!state.open);
}

#[test]
fn credential_changes_apply_to_the_next_acquisition() {
    let (mut engine, client) = engine();
    engine.set_host("198.51.100.7");
    engine.set_username("operator");
    engine.set_password("hunter2");

    engine.list_targets().unwrap();

    let state = client.state.borrow();
    assert_eq!(state.opens[0].host, "198.51.100.7");
    assert_eq!(state.opens[0].username, "operator");
    assert_eq!(state.opens[0].password, "hunter2");
}

#[test]
fn adding_a_target_names_it_after_its_host() {
    let (mut engine, client) = engine();

    engine.add_target("192.0.2.9").unwrap();

    let state = client.state.borrow();
    assert_eq!(
        state.created_targets,
        vec![("192.0.2.9".to_string(), "192.0.2.9".to_string())]
    );
}

#[test]
fn listing_targets_replaces_the_positional_index() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().targets = one_target();
    assert_eq!(engine.list_targets().unwrap(), vec!["192.0.2.9"]);

    client.state.borrow_mut().targets = vec![TargetRecord {
        id: "tgt-2".to_string(),
        hosts: "192.0.2.10".to_string(),
    }];
    assert_eq!(engine.list_targets().unwrap(), vec!["192.0.2.10"]);
}

#[test]
fn a_scan_without_a_config_name_uses_host_discovery() {
    let (mut engine, client) = engine();
    {
        let mut state = client.state.borrow_mut();
        state.configs = stock_configs();
        state.targets = one_target();
    }
    engine.list_targets().unwrap();

    let task_id = engine.scan(0, None).unwrap();

    let state = client.state.borrow();
    let task = &state.created_tasks[0];
    assert_eq!(task.config_id, "cfg-host");
    assert_eq!(task.target_id, "tgt-1");
    assert_eq!(task.name, "Scan of IP 192.0.2.9");
    assert_eq!(state.started_tasks, vec![task_id]);
}

#[test]
fn a_scan_with_an_explicit_config_resolves_it_by_exact_name() {
    let (mut engine, client) = engine();
    {
        let mut state = client.state.borrow_mut();
        state.configs = stock_configs();
        state.targets = one_target();
    }
    engine.list_targets().unwrap();

    engine.scan(0, Some("Full and fast")).unwrap();

    assert_eq!(client.state.borrow().created_tasks[0].config_id, "cfg-full");
}

#[test]
fn an_unknown_config_name_fails_and_still_closes() {
    let (mut engine, client) = engine();
    {
        let mut state = client.state.borrow_mut();
        state.configs = stock_configs();
        state.targets = one_target();
    }
    engine.list_targets().unwrap();

    let err = engine.scan(0, Some("host discovery")).unwrap_err();
    assert!(matches!(err, Error::ConfigNotFound(_)));

    let state = client.state.borrow();
    assert!(state.created_tasks.is_empty());
    assert_eq!(state.opens.len(), state.closes);
}

#[test]
fn a_stale_target_index_fails_before_any_connection() {
    let (mut engine, client) = engine();

    let err = engine.scan(3, None).unwrap_err();
    assert!(matches!(
        err,
        Error::IndexOutOfRange { index: 3, len: 0 }
    ));
    assert!(client.state.borrow().opens.is_empty());
}

#[test]
fn running_tasks_carry_status_and_percentage() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().tasks = vec![
        TaskRecord {
            id: "t-1".to_string(),
            name: "Scan of IP 192.0.2.9".to_string(),
            status: "Running".to_string(),
            progress: 42,
        },
        TaskRecord {
            id: "t-2".to_string(),
            name: "Scan of IP 192.0.2.10".to_string(),
            status: "Done".to_string(),
            progress: -1,
        },
    ];

    let tasks = engine.tasks().unwrap();
    assert_eq!(tasks[0].progress, "Running: 42%");
    assert_eq!(tasks[1].progress, "Done");
}

#[test]
fn report_formats_render_name_and_summary() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().formats = vec![ReportFormat {
        id: "fmt-1".to_string(),
        name: "TXT".to_string(),
        summary: "Plain text report".to_string(),
        extension: "txt".to_string(),
    }];

    assert_eq!(
        engine.report_formats().unwrap(),
        vec!["TXT: Plain text report"]
    );
}

#[test]
fn reports_render_task_and_creation_time() {
    let (mut engine, client) = engine();
    client.state.borrow_mut().reports = vec![ReportRecord {
        id: "rep-1".to_string(),
        task_name: "Scan of IP 192.0.2.9".to_string(),
        creation_time: "2019-04-02T10:17:52Z".to_string(),
    }];

    assert_eq!(
        engine.reports().unwrap(),
        vec!["Task Scan of IP 192.0.2.9, created at 2019-04-02T10:17:52Z"]
    );
}

#[test]
fn downloading_a_report_writes_path_dot_extension() {
    let (mut engine, client) = engine();
    {
        let mut state = client.state.borrow_mut();
        state.formats = vec![ReportFormat {
            id: "fmt-1".to_string(),
            name: "TXT".to_string(),
            summary: "Plain text report".to_string(),
            extension: "txt".to_string(),
        }];
        state.reports = vec![ReportRecord {
            id: "rep-1".to_string(),
            task_name: "Scan of IP 192.0.2.9".to_string(),
            creation_time: "2019-04-02T10:17:52Z".to_string(),
        }];
        state.report_content = "scan findings".to_string();
    }
    engine.report_formats().unwrap();
    engine.reports().unwrap();

    let base = std::env::temp_dir().join(format!("redops-report-{}", std::process::id()));
    let destination = engine
        .download_report(0, 0, base.to_str().unwrap())
        .unwrap();

    assert!(destination.to_str().unwrap().ends_with(".txt"));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "scan findings");
    assert_eq!(
        client.state.borrow().downloads,
        vec![("rep-1".to_string(), "fmt-1".to_string())]
    );
    fs::remove_file(destination).unwrap();
}

#[test]
fn downloading_with_a_stale_report_index_fails() {
    let (mut engine, _) = engine();
    assert!(matches!(
        engine.download_report(5, 0, "report"),
        Err(Error::IndexOutOfRange { index: 5, len: 0 })
    ));
}
