use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SKY_CAT: &str = "id bt bulge_radius disk_radius\n1 0.7 8 4\n2 0.3 2 6\n";
const SKY_CONF: &str = "IMAGE_NAME      sky.fits        # Name of the output frame\n\
                        IMAGE_SIZE      256\n";

fn eggfit() -> Command {
    Command::cargo_bin("eggfit").expect("eggfit binary")
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path.to_string_lossy().into_owned()
}

#[test]
fn bulge_disk_writes_both_catalogs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cat = write(dir.path(), "egg.cat", SKY_CAT);
    let conf = write(dir.path(), "sky.conf", SKY_CONF);

    eggfit()
        .args(["--log-level", "warn", "bulge-disk", "--catalog", &cat, "--config", &conf])
        .assert()
        .success()
        .stdout(predicate::str::contains("egg_bulge.cat"))
        .stdout(predicate::str::contains("egg_disk.cat"));

    let bulge = fs::read_to_string(dir.path().join("egg_bulge.cat")).expect("bulge");
    assert!(bulge.contains("1 1 8 4"));
    let disk_conf = fs::read_to_string(dir.path().join("sky_disk.conf")).expect("conf");
    assert!(disk_conf.contains("sky_disk.fits"));
    assert!(disk_conf.contains("IMAGE_SIZE      256"));
}

#[test]
fn half_radius_halves_radii() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cat = write(dir.path(), "egg.cat", SKY_CAT);
    let conf = write(dir.path(), "sky.conf", SKY_CONF);

    eggfit()
        .args(["half-radius", "--catalog", &cat, "--config", &conf])
        .assert()
        .success();

    let text = fs::read_to_string(dir.path().join("egg_reL2.cat")).expect("reL2");
    assert!(text.contains("1 0.7 4 2"));
    let conf = fs::read_to_string(dir.path().join("sky_reL2.conf")).expect("conf");
    assert!(conf.contains("sky_reL2.fits"));
}

#[cfg(unix)]
#[test]
fn failing_simulator_fails_the_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cat = write(dir.path(), "egg.cat", SKY_CAT);
    let conf = write(dir.path(), "sky.conf", SKY_CONF);

    eggfit()
        .args([
            "half-radius",
            "--catalog",
            &cat,
            "--config",
            &conf,
            "--mode",
            "catalog-and-image",
            "--skymaker",
            "false",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("simulator `false` failed"));
}

#[test]
fn to_adu_rejects_non_positive_exposure() {
    let dir = tempfile::tempdir().expect("tempdir");
    eggfit()
        .args(["to-adu", "--exposure", "0"])
        .arg(dir.path().join("missing.fits"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("exposure time"));
}

#[test]
fn flag_prints_counts_and_writes_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cat = write(
        dir.path(),
        "fit.cat",
        "SERSIC_GALFIT SERSICERR_GALFIT ELLIPTICITYERR_GALFIT ARERR_GALFIT RE_GALFIT \
         REERR_GALFIT MAGERR_GALFIT MAG_BEST FLAGS_GALFIT\n\
         2 0.1 0.1 0.1 3 0.1 0.1 21 GOOD\n\
         2 0.1 0.1 0.1 3 0.1 0.1 21 BAD\n\
         2 nan 0.1 0.1 3 0.1 0.1 21 GOOD\n\
         2 0.1 0.1 0.1 3 0.1 0.1 27 GOOD\n",
    );
    let out = dir.path().join("quality.json");

    eggfit()
        .args(["flag", &cat, "--mag-limit", "25", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("good: 1"))
        .stdout(predicate::str::contains("suspicious: 1"))
        .stdout(predicate::str::contains("bad: 1"))
        .stdout(predicate::str::contains("unavailable: 1"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("report")).expect("json");
    assert_eq!(report["partition"]["bad"], serde_json::json!([3]));
    assert_eq!(report["params"]["mag_limit"], serde_json::json!(25.0));
}

#[test]
fn crossmatch_reports_error_tally() {
    let dir = tempfile::tempdir().expect("tempdir");
    let galfit = write(
        dir.path(),
        "galfit.cat",
        "X_IMAGE Y_IMAGE RE_GALFIT FIT_DONE\n10 10 2 1\n10.5 10 2 1\n40 40 1.5 1\n",
    );
    let egg = write(dir.path(), "egg.cat", "x y\n10 10\n40.5 40.2\n");
    let out = dir.path().join("report.json");

    eggfit()
        .args(["crossmatch", "--candidates", &galfit, "--references", &egg, "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved: 2"))
        .stdout(predicate::str::contains("conflicts: 1"))
        .stdout(predicate::str::contains("number of errors: 1"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("report")).expect("json");
    assert_eq!(report["correspondences"][2]["reference"], serde_json::json!(1));
    assert_eq!(report["failed"], serde_json::json!([1]));
}

#[test]
fn crossmatch_without_inputs_fails() {
    eggfit()
        .arg("crossmatch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--candidates"));
}

#[test]
fn unknown_log_level_is_rejected() {
    eggfit()
        .args(["--log-level", "verbose", "crossmatch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown level \"verbose\""));
}

#[test]
fn crossmatch_takes_unfit_escape_radius() {
    let dir = tempfile::tempdir().expect("tempdir");
    let galfit = write(
        dir.path(),
        "galfit.cat",
        "X_IMAGE Y_IMAGE RE_GALFIT FIT_DONE\n10 10 2 1\n2500 2500 900 0\n",
    );
    let egg = write(dir.path(), "egg.cat", "x y\n10 10\n5000 5000\n");
    let out = dir.path().join("report.json");

    eggfit()
        .args([
            "--log-level",
            "debug",
            "crossmatch",
            "--candidates",
            &galfit,
            "--references",
            &egg,
            "--unfit-escape-radius",
            "25",
            "--output",
        ])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved: 1"))
        .stdout(predicate::str::contains("unresolved: 1"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("report")).expect("json");
    assert_eq!(report["params"]["unfit_escape_radius"], serde_json::json!(25.0));
    assert_eq!(report["correspondences"][1]["reference"], serde_json::Value::Null);
}
