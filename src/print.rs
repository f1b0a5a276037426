use ir_blaster::drivers::mini_uart;

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    mini_uart::_mu_print(args);
}

#[macro_export]
macro_rules! print {
    ($($tok:tt)*) => ({
        $crate::print::_print(format_args!($($tok)*))
    });
}

#[macro_export]
macro_rules! println {
    () => ({
        $crate::print::_print(format_args!("\n"));
    });

    ($($tok:tt)*) => ({
        $crate::print::_print(format_args_nl!($($tok)*));
    });
}
