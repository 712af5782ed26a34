// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

pub mod x11;
