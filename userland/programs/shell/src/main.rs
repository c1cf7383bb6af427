#![no_std]
#![no_main]

use core::panic::PanicInfo;
use libuser::io::{pipe, println, read, write};
use libuser::process::{exit, fork, join};

#[no_mangle]
#[link_section = ".text.entry"]
pub extern "C" fn _start() -> ! {
    println("Hello from Userland Shell!");
    println("=== Testing IPC Pipes ===\n");

    let (write_fd, read_fd) = match pipe() {
        Ok(fds) => fds,
        Err(()) => {
            println("Failed to create pipe");
            exit(1);
        }
    };

    println("Pipe created successfully");

    let result = fork();

    if result == 0 {
        // Child process: write to pipe
        println("[Child] Writing to pipe...");

        let message = b"Hello from child process!";
        if write(write_fd, message) < 0 {
            println("[Child] Write failed");
            exit(1);
        }
        println("[Child] Wrote bytes to pipe");

        println("[Child] Exiting");
        exit(0);
    } else if result > 0 {
        // Parent process: read from pipe
        println("[Parent] Reading from pipe...");

        let mut buffer = [0u8; 64];
        let n = read(read_fd, &mut buffer);
        if n > 0 {
            println("[Parent] Read bytes from pipe");
            if core::str::from_utf8(&buffer[..n as usize]).is_ok() {
                println("[Parent] Message received from child");
            }
        } else {
            println("[Parent] Read failed");
        }

        // Wait for the child we just forked
        join();
        println("[Parent] Child terminated");
        println("\n=== Pipe Test Complete ===");
        exit(0);
    } else {
        println("Fork failed!");
        exit(1);
    }
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    println("Shell Panic!");
    exit(1);
}
