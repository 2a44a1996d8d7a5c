// SPDX-License-Identifier: GPL-3.0-only

//! Line-based interactive consoles for the two scanner pages
//!
//! Each console reads commands from stdin while the page keeps running.
//! Ctrl-C and end of input both leave the loop; the page releases the camera
//! when it is dropped.

use codescan::app::{BarcodeScanPage, QrScanPage};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Commands of the QR console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrCommand {
    Start,
    Stop,
    Scan,
    Geo,
    Help,
    Quit,
}

impl FromStr for QrCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(QrCommand::Start),
            "stop" => Ok(QrCommand::Stop),
            "scan" | "s" => Ok(QrCommand::Scan),
            "geo" | "location" => Ok(QrCommand::Geo),
            "help" | "?" => Ok(QrCommand::Help),
            "quit" | "exit" | "q" => Ok(QrCommand::Quit),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

/// Commands of the barcode console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeCommand {
    /// Empty line or `scan`
    Toggle,
    Help,
    Quit,
}

impl FromStr for BarcodeCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "scan" | "s" => Ok(BarcodeCommand::Toggle),
            "help" | "?" => Ok(BarcodeCommand::Help),
            "quit" | "exit" | "q" => Ok(BarcodeCommand::Quit),
            other => Err(format!("unknown command '{}'", other)),
        }
    }
}

fn prompt(hint: &str) {
    print!("[{}] > ", hint);
    let _ = std::io::stdout().flush();
}

fn qr_hint(page: &QrScanPage) -> String {
    let controls = page.session().controls;
    let mut available = Vec::new();
    if controls.start {
        available.push("start");
    }
    if controls.stop {
        available.push("stop");
    }
    if controls.scan {
        available.push("scan");
    }
    if controls.geolocate {
        available.push("geo");
    }
    available.push("quit");
    available.join(" | ")
}

/// Run the QR console until `quit`, end of input or Ctrl-C
pub async fn run_qr(page: &mut QrScanPage) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("QR scanner. Type 'help' for commands.");
    loop {
        prompt(&qr_hint(page));

        let line = tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                debug!("Interrupted");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<QrCommand>() {
            Ok(QrCommand::Start) => page.start_camera().await,
            Ok(QrCommand::Stop) => page.stop_camera(),
            Ok(QrCommand::Scan) => page.scan().await,
            Ok(QrCommand::Geo) => page.geolocate().await,
            Ok(QrCommand::Help) => {
                println!("start  open the camera");
                println!("stop   release the camera");
                println!("scan   decode the current frame and submit it");
                println!("geo    show the current position");
                println!("quit   exit");
            }
            Ok(QrCommand::Quit) => break,
            Err(e) => println!("{}", e),
        }
    }

    if page.session().camera_active {
        page.stop_camera();
    }
    Ok(())
}

/// Run the barcode console until `quit`, end of input or Ctrl-C
///
/// Detection outcomes are handled as soon as they arrive, without waiting
/// for the next command.
pub async fn run_barcode(page: &mut BarcodeScanPage) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Barcode scanner. Press Enter to start or stop, 'quit' to exit.");
    prompt(page.session().toggle_label());
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                debug!("Interrupted");
                break;
            }
            outcome = page.next_outcome() => {
                page.handle_outcome(outcome).await;
                prompt(page.session().toggle_label());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.parse::<BarcodeCommand>() {
                    Ok(BarcodeCommand::Toggle) => page.toggle().await,
                    Ok(BarcodeCommand::Help) => {
                        println!("Enter  start or stop scanning");
                        println!("quit   exit");
                    }
                    Ok(BarcodeCommand::Quit) => break,
                    Err(e) => println!("{}", e),
                }
                prompt(page.session().toggle_label());
            }
        }
    }

    if page.session().is_scanning {
        page.stop_scanning();
    }
    Ok(())
}
