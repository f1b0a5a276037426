mod utils;

use std::ops::Not;
use std::process::{Command, Stdio};
use std::{env, io};

use utils::{print_command, print_info};

const ARCH: &str = "aarch64-unknown-none-softfloat";
const KERNEL_OUT: &str = "target/aarch64-unknown-none-softfloat/release/kernel";
const KERNEL_BIN: &str = "kernel.bin";
const LINKER_FILE: &str = "src/arch/link.ld";

type AnyErr = Box<dyn std::error::Error>;
type Result = std::result::Result<(), AnyErr>;

fn main() {
    let subcommand = env::args().nth(1);
    let res = match subcommand.as_deref() {
        Some("build") => build(),
        Some("qemu") => build().and_then(|_| qemu()),
        Some("test") => test(),

        _ => {
            eprintln!("Tasks:");
            eprintln!("  build - build kernel.bin");
            eprintln!("  qemu  - build and run on an emulated Raspberry Pi 3");
            eprintln!("  test  - run the library tests on the host");
            Ok(())
        }
    };

    if let Err(e) = res {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn cargo() -> Command {
    Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()))
}

fn run(cmd: &mut Command, what: &str) -> Result {
    print_command(cmd);
    if cmd.status()?.success().not() {
        return Err(format!("{} failed", what).into());
    }
    Ok(())
}

fn build() -> Result {
    check_deps()?;

    let mut rustc = cargo();
    rustc
        .arg("rustc")
        .args(["--target", ARCH])
        .args(["--features", "kernel"])
        .args(["--bin", "kernel"])
        .arg("--release")
        .arg("--")
        .args(["-C", &format!("link-arg=-T{}", LINKER_FILE)])
        .args(["-C", "target-cpu=cortex-a53"])
        .args(["-C", "relocation-model=static"])
        .args(["-D", "warnings"]);
    run(&mut rustc, "Build")?;

    let mut objcopy = Command::new("rust-objcopy");
    objcopy
        .arg("--strip-all")
        .args(["-O", "binary"])
        .arg(KERNEL_OUT)
        .arg(KERNEL_BIN);
    run(&mut objcopy, "Objcopy")?;

    print_info(format!("wrote {}", KERNEL_BIN));
    Ok(())
}

fn test() -> Result {
    run(cargo().args(["test", "--lib"]), "Tests")
}

fn check_deps() -> Result {
    if Command::new("rust-objcopy")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_or(false, |s| s.success())
    {
        return Ok(());
    }

    eprintln!("Could not find rust-objcopy which is required for the build, would you like to install it? [y/n]");
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if let "y" | "yes" = input.trim().to_lowercase().as_ref() {
        run(cargo().args(["install", "cargo-binutils"]), "Installing 'cargo-binutils'")?;
        run(
            Command::new("rustup").args(["component", "add", "llvm-tools-preview"]),
            "Adding component 'llvm-tools-preview'",
        )?;
    }

    Ok(())
}

fn qemu() -> Result {
    check_qemu()?;

    // The Mini UART is the second serial port of the raspi3b machine.
    run(
        Command::new("qemu-system-aarch64")
            .args(["-M", "raspi3b"])
            .args(["-display", "none"])
            .args(["-serial", "null"])
            .args(["-serial", "stdio"])
            .args(["-kernel", KERNEL_BIN]),
        "Qemu",
    )
}

fn check_qemu() -> Result {
    if Command::new("qemu-system-aarch64")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?
        .success()
        .not()
    {
        return Err("Could not find required binary 'qemu-system-aarch64'".into());
    }

    Ok(())
}
