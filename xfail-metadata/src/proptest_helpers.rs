// Copyright (c) The xfail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{Outcome, OutcomeRecord, Stage, TestCaseName};
use proptest::prelude::*;

impl Arbitrary for TestCaseName {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        // A small alphabet so that generated records frequently collide on the same test case.
        "test_[a-f]{1,2}".prop_map(TestCaseName::new).boxed()
    }
}

impl Arbitrary for Stage {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::sample::select(Stage::ALL.to_vec()).boxed()
    }
}

impl Arbitrary for Outcome {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(Outcome::Passed),
            Just(Outcome::Failed),
            Just(Outcome::Errored),
            Just(Outcome::Skipped),
        ]
        .boxed()
    }
}

impl Arbitrary for OutcomeRecord {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<TestCaseName>(),
            any::<Stage>(),
            any::<Outcome>(),
            proptest::option::of("[a-z ]{0,12}"),
        )
            .prop_map(|(test_case, stage, outcome, message)| OutcomeRecord {
                test_case,
                stage,
                outcome,
                message,
            })
            .boxed()
    }
}
