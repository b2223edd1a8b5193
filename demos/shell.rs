//! Interactive line-oriented command shell over a [`fitheap::Heap`].
//!
//! Ported from `original_source/src/mem_shell.c`. Each command is its own
//! branch with no fallthrough to the next — the C original's `f` command
//! falls through into `p` (print free blocks) by omitting a `break`; that
//! is flagged as likely unintended and not reproduced here.
//!
//! With the `check` feature enabled, `f` reports the typed rejection
//! reason via `Heap::validate_busy_pointer` before attempting the free,
//! instead of silently no-opping on a bad offset.

use std::io::{self, BufRead, Write};

use fitheap::Heap;

const REGION_SIZE: usize = 64 * 1024;

fn help() {
  println!("-------------- memory shell --------------");
  println!("Interactive memory shell of size {} bytes", REGION_SIZE);
  println!("Supported commands:");
  println!("\ta N : allocates N bytes");
  println!("\tf OFF : free allocated memory at offset OFF");
  println!("\tp : print free blocks");
  println!("\tb : print busy blocks");
  println!("\tg : print fragmentation info");
  println!("\th : print this help message");
  println!("\tq : quit");
}

fn main() {
  tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

  let heap = Heap::<REGION_SIZE>::new();
  heap.init();

  let stdin = io::stdin();
  let mut lines = stdin.lock().lines();

  help();

  loop {
    print!("? ");
    io::stdout().flush().ok();

    let Some(Ok(line)) = lines.next() else {
      break;
    };
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let arg = parts.next().unwrap_or("").trim();

    match cmd {
      "a" => match arg.parse::<usize>() {
        Ok(n) => match heap.allocate(n) {
          Some(ptr) => {
            let offset = (ptr.as_ptr() as usize) - (heap.heap_base() as usize);
            println!("Memory allocated at {offset}");
          }
          None => println!("Allocation failed"),
        },
        Err(_) => eprintln!("Command not found !"),
      },
      "f" => match arg.parse::<usize>() {
        Ok(offset) => {
          let addr = unsafe { heap.heap_base().add(offset) };
          #[cfg(feature = "check")]
          if let Err(err) = heap.validate_busy_pointer(addr) {
            eprintln!("{err}");
            continue;
          }
          heap.deallocate(addr);
        }
        Err(_) => eprintln!("Command not found !"),
      },
      "p" => {
        for (offset, size) in heap.free_blocks() {
          println!("Free block at address {offset}, size {size}");
        }
      }
      "b" => {
        for (offset, size) in heap.busy_blocks() {
          println!("Busy block at address {offset}, size {size}");
        }
      }
      "g" => {
        println!("Fragmentation at this point is {:.3}", heap.fragmentation());
      }
      "h" => help(),
      "q" => {
        std::process::exit(0);
      }
      other => {
        eprintln!("Command not found ! ({other})");
        help();
      }
    }
  }
}
