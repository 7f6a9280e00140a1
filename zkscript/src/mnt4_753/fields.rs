use crate::fields::{Fq2, Fq4, TowerNonResidue};
use crate::mnt4_753::{GAMMAS, MODULUS, NON_RESIDUE};

/// The `F_q^2` script builder wired for MNT4-753 (`u^2 = 13`, towering by
/// `s^2 = u`).
pub fn fq2_script() -> Fq2 {
    Fq2::new(MODULUS.clone(), NON_RESIDUE.clone(), TowerNonResidue::U)
}

/// The `F_q^4` script builder wired for MNT4-753.
pub fn fq4_script() -> Fq4 {
    Fq4::new(MODULUS.clone(), fq2_script(), GAMMAS.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::PrimeFieldExtension;

    #[test]
    fn towers_share_the_characteristic() {
        assert_eq!(fq2_script().modulus(), &*MODULUS);
        assert_eq!(fq4_script().modulus(), &*MODULUS);
        assert_eq!(fq4_script().extension_degree(), 4);
    }
}
