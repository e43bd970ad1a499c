// Copyright (c) 2026 Amunchain
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

// Exercises the option-delta/length nibble parser in isolation: a fixed,
// valid 4-byte header with a zero-length token, followed by arbitrary
// bytes as the option region `decode` walks.
fuzz_target!(|data: &[u8]| {
    let mut datagram = vec![0x40, 0x01, 0x00, 0x00];
    datagram.extend_from_slice(data);
    let _ = coap_transport::codec::decode(&datagram);
});
