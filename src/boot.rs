#[no_mangle]
#[link_section = ".text._start_arguments"]
pub static BOOT_CORE_ID: u64 = 0;

core::arch::global_asm!(include_str!("boot/boot.S"));

/// Entered from `_start` on the boot core, with the stack set up and `.bss` zeroed.
#[no_mangle]
pub unsafe extern "C" fn _start_rust() -> ! {
    crate::kernel_init()
}
