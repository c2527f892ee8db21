// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! String-only writers.
//!
//! Reporters write human-readable text to standard output, standard error, or an in-memory
//! buffer in tests. [`WriteStr`] abstracts over all three. It is similar to [`std::fmt::Write`],
//! but returns [`std::io::Error`] so that failures writing to a closed pipe can be propagated.

use std::{
    fmt,
    io::{self, BufWriter, Write},
};

/// A trait that abstracts over writing strings to a writer.
pub trait WriteStr {
    /// Writes a string to the writer.
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    /// Flushes the writer.
    fn write_str_flush(&mut self) -> io::Result<()>;

    /// Writes a formatted string to the writer.
    fn write_fmt(&mut self, fmt: fmt::Arguments<'_>) -> io::Result<()> {
        // Translates `self` into a `fmt::Write`, saving off the first IO error.
        struct Adapter<'a, T: ?Sized> {
            inner: &'a mut T,
            error: io::Result<()>,
        }

        impl<T: ?Sized + WriteStr> fmt::Write for Adapter<'_, T> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.inner.write_str(s).map_err(|error| {
                    self.error = Err(error);
                    fmt::Error
                })
            }
        }

        let mut output = Adapter {
            inner: self,
            error: Ok(()),
        };
        match fmt::write(&mut output, fmt) {
            Ok(()) => Ok(()),
            Err(_) if output.error.is_err() => output.error,
            Err(_) => Err(io::Error::other("formatter error")),
        }
    }
}

impl WriteStr for String {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> WriteStr for BufWriter<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_all(s.as_bytes())
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<T: WriteStr + ?Sized> WriteStr for &mut T {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        (**self).write_str_flush()
    }

    fn write_fmt(&mut self, fmt: fmt::Arguments<'_>) -> io::Result<()> {
        (**self).write_fmt(fmt)
    }
}
