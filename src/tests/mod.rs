// Licensed under the Apache-2.0 license

//! Host-side mocks and cross-module tests.
