/*! Cross-module tests for the core model.
 *
 * Unit tests live next to each module; these exercise the analyses together on small contracts
 * built by hand, the way the transform crate feeds them.
 */

mod inference_tests;
mod planning_tests;
