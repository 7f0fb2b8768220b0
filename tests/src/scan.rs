#![cfg(test)]

use redops_common::Error;
use redops_core::scan::ScanEngine;

use crate::support::FakeScanner;

fn engine() -> (ScanEngine<FakeScanner>, FakeScanner) {
    let scanner = FakeScanner::default();
    (ScanEngine::new(scanner.clone()), scanner)
}

#[test]
fn hosts_get_sequential_insertion_ids() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();
    engine.add_host("192.0.2.2", None, None).unwrap();

    let hosts = engine.hosts();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0].id, 0);
    assert_eq!(hosts[1].id, 1);
    assert_eq!(hosts[1].ip, "192.0.2.2");
}

#[test]
fn an_empty_ip_registers_nothing() {
    let (mut engine, _) = engine();
    assert!(engine.add_host("", None, None).unwrap().is_none());
    assert!(engine.hosts().is_empty());
}

#[test]
fn a_valid_port_range_formats_as_low_dash_high() {
    let (mut engine, _) = engine();
    let host = engine.add_host("192.0.2.1", Some(5), Some(10)).unwrap();
    assert_eq!(host.unwrap().ports.as_deref(), Some("5-10"));
}

#[test]
fn a_backward_port_range_is_rejected() {
    let (mut engine, _) = engine();
    let err = engine.add_host("192.0.2.1", Some(10), Some(5)).unwrap_err();
    assert!(matches!(
        err,
        Error::PortRangeInvalid { first: 10, last: 5 }
    ));
    assert!(engine.hosts().is_empty());
}

#[test]
fn a_single_first_port_stands_alone() {
    let (mut engine, _) = engine();
    let host = engine.add_host("192.0.2.1", Some(80), None).unwrap();
    assert_eq!(host.unwrap().ports.as_deref(), Some("80"));
}

#[test]
fn a_lone_last_port_is_ignored() {
    let (mut engine, _) = engine();
    let host = engine.add_host("192.0.2.1", None, Some(443)).unwrap();
    assert_eq!(host.unwrap().ports, None);
}

#[test]
fn scanning_with_no_hosts_fails() {
    let (mut engine, _) = engine();
    assert!(matches!(
        engine.scan_host(Some(0)),
        Err(Error::NoHostsRegistered)
    ));
}

#[test]
fn scanning_an_unknown_id_fails_distinctly() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();
    assert!(matches!(
        engine.scan_host(Some(4)),
        Err(Error::IndexOutOfRange { index: 4, len: 1 })
    ));
}

#[test]
fn scan_defaults_to_the_most_recently_added_host() {
    let (mut engine, scanner) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();
    engine.add_host("192.0.2.2", None, None).unwrap();

    engine.scan_host(None).unwrap();

    let state = scanner.state.borrow();
    assert_eq!(state.calls.len(), 1);
    assert_eq!(state.calls[0].ip, "192.0.2.2");
}

#[test]
fn scan_passes_the_port_spec_and_no_arguments_without_scripts() {
    let (mut engine, scanner) = engine();
    engine.add_host("192.0.2.1", Some(5), Some(10)).unwrap();

    engine.scan_host(Some(0)).unwrap();

    let state = scanner.state.borrow();
    assert_eq!(state.calls[0].ports.as_deref(), Some("5-10"));
    assert_eq!(state.calls[0].arguments, None);
}

#[test]
fn a_second_scan_request_returns_the_cached_blob() {
    let (mut engine, scanner) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();

    let first = engine.scan_host(Some(0)).unwrap().clone();
    let second = engine.scan_host(Some(0)).unwrap().clone();

    assert_eq!(first, second);
    assert_eq!(scanner.state.borrow().calls.len(), 1);
}

#[test]
fn registered_scripts_chain_into_the_scan_arguments() {
    let (mut engine, scanner) = engine();
    engine.add_script("smb-vuln-ms17-010", &[]);
    engine.add_script("http-title", &["useget=true".to_string()]);
    engine.add_host("192.0.2.1", None, None).unwrap();

    engine.scan_host(Some(0)).unwrap();

    let state = scanner.state.borrow();
    assert_eq!(
        state.calls[0].arguments.as_deref(),
        Some("-sV --script smb-vuln-ms17-010,http-title --script-args 'useget=true'")
    );
}

#[test]
fn scripts_apply_to_every_subsequent_scan() {
    let (mut engine, scanner) = engine();
    engine.add_script("banner", &[]);
    engine.add_host("192.0.2.1", None, None).unwrap();
    engine.add_host("192.0.2.2", None, None).unwrap();

    engine.scan_host(Some(0)).unwrap();
    engine.scan_host(Some(1)).unwrap();

    let state = scanner.state.borrow();
    assert_eq!(state.calls.len(), 2);
    assert!(state.calls.iter().all(|call| {
        call.arguments.as_deref() == Some("-sV --script banner")
    }));
}

#[test]
fn all_host_results_come_back_in_registration_order() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();
    engine.add_host("192.0.2.2", None, None).unwrap();
    engine.scan_host(Some(0)).unwrap();
    engine.scan_host(Some(1)).unwrap();

    let results = engine.host_results(true, &[]).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].unwrap().hosts[0].address, "192.0.2.1");
    assert_eq!(results[1].unwrap().hosts[0].address, "192.0.2.2");
}

#[test]
fn results_for_an_out_of_range_id_fail() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();

    assert!(matches!(
        engine.host_results(false, &[2]),
        Err(Error::IndexOutOfRange { index: 2, len: 1 })
    ));
}

#[test]
fn results_without_ids_are_empty() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();
    assert!(engine.host_results(false, &[]).unwrap().is_empty());
}

#[test]
fn an_unscanned_host_lists_no_results() {
    let (mut engine, _) = engine();
    engine.add_host("192.0.2.1", None, None).unwrap();

    let results = engine.host_results(true, &[]).unwrap();
    assert_eq!(results, vec![None]);
}
