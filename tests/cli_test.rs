use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use voxhive::store::HiveFile;
use voxhive::volume::Volume;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn write_sample(path: &std::path::Path) -> STDRESULT {
    let mut vol: Volume<f32> = Volume::new(2,2,0.0);
    vol.set_name("density")?;
    vol.set_description("cli test volume")?;
    vol.set(1,2,3,0.5)?;
    vol.set(-4,-4,-4,0.75)?;
    let mut file = HiveFile::new();
    vol.write_file(&mut file)?;
    file.save(path)?;
    Ok(())
}

#[test]
fn info_lists_volumes() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("sample.hive");
    write_sample(&path)?;
    let mut cmd = Command::cargo_bin("voxhive")?;
    cmd.arg("info")
        .arg("-i").arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("density (f32)"))
        .stdout(predicate::str::contains("cli test volume"));
    Ok(())
}

#[test]
fn dump_prints_set_voxels() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("sample.hive");
    write_sample(&path)?;
    let mut cmd = Command::cargo_bin("voxhive")?;
    cmd.arg("dump")
        .arg("-i").arg(&path)
        .arg("-n").arg("density")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 2 3 0.5"))
        .stdout(predicate::str::contains("-4 -4 -4 0.75"));
    Ok(())
}

#[test]
fn missing_file_fails() -> STDRESULT {
    let mut cmd = Command::cargo_bin("voxhive")?;
    cmd.arg("info")
        .arg("-i").arg("no_such_file.hive")
        .assert()
        .failure();
    Ok(())
}
