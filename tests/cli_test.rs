use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const SECRET: &str = "0123456789abcdef";

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("cardledger"));
    cmd.arg("tests/fixtures/ops.csv").arg("--secret").arg(SECRET);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "card,owner,number,expires,status,balance",
        ))
        // Card 1: funded with 200.00, then sent 100.00 away.
        .stdout(predicate::str::contains("2031-01,active,100.00"))
        // Card 2: funded with 50.00, then received 100.00.
        .stdout(predicate::str::contains("2031-06,active,150.00"))
        // Card 3: blocked, never funded.
        .stdout(predicate::str::contains("2031-03,blocked,0"))
        // Numbers are masked in the output.
        .stdout(predicate::str::contains("**** **** **** "))
        // The create for the unenrolled owner 2 was skipped.
        .stdout(predicate::str::contains("2031-04").not());

    Ok(())
}

#[test]
fn test_cli_rejects_bad_secret() {
    let mut cmd = Command::new(cargo_bin!("cardledger"));
    cmd.arg("tests/fixtures/ops.csv")
        .arg("--secret")
        .arg("too-short");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("secret must be exactly 16 bytes"));
}

#[test]
fn test_cli_missing_input_file() {
    let mut cmd = Command::new(cargo_bin!("cardledger"));
    cmd.arg("tests/fixtures/no-such-file.csv")
        .arg("--secret")
        .arg(SECRET);

    cmd.assert().failure();
}
