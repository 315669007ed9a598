// ABOUTME: Service layer coordinating store mutations with cache invalidation
// ABOUTME: Every mutation invalidates affected cache entries before returning

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

pub mod identity;

pub use identity::IdentityService;
