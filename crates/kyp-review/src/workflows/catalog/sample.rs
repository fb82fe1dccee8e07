/// Bundled demonstration catalog: one reference fund family (TD) and ten peers across other providers.
pub const SAMPLE_CATALOG_CSV: &str = "\
Code,Name,Provider,Provider Name,Classification,Risk,Objective,MER,1Y,3Y,5Y
TDB909,TD Comfort Balanced Income Portfolio,TD,TD Asset Management,Global Neutral Balanced,M,Balanced Growth,2.02%,6.1%,4.8%,5.2%
TDB622,TD Monthly Income Fund,TD,TD Asset Management,Canadian Neutral Balanced,LM,Income,1.49%,5.2%,4.1%,4.6%
RBF556,RBC Select Balanced Portfolio,RBC,Royal Bank Global Asset Management,Global Neutral Balanced,M,Balanced Growth,1.94%,8.4%,5.6%,6.0%
BMO200,BMO Growth ETF Portfolio,BMO,BMO Investments Inc.,Global Equity Balanced,MH,Growth,1.61%,4.9%,3.7%,4.2%
CIB851,CIBC Balanced Index Fund,CIB,CIBC Asset Management,Global Neutral Balanced,M,Balanced Growth,1.12%,9.6%,6.2%,6.4%
MFC4463,Manulife Monthly High Income,MFC,Manulife Investment Management,Canadian Neutral Balanced,LM,Income,2.19%,4.4%,3.1%,3.9%
FID1171,Fidelity Global Balanced Portfolio,FID,Fidelity Investments Canada,Global Neutral Balanced,M,Balanced Growth,2.26%,7.7%,5.9%,6.8%
AGF1002,AGF Global Balanced Fund,AGF,AGF Investments Inc.,Global Neutral Balanced,M,Balanced Growth,2.48%,2.9%,2.4%,3.3%
DYN2680,Dynamic Global Balanced Fund,DYN,Dynamic Funds,Global Neutral Balanced,M,Balanced Growth,2.21%,3.5%,1.8%,3.0%
MAW104,Mawer Balanced Fund,MAW,Mawer Investment Management,Global Neutral Balanced,LM,Balanced Growth,0.91%,10.2%,6.8%,7.1%
SLF740,Sun Life Granite Balanced Portfolio,SLF,Sun Life Global Investments,Global Neutral Balanced,M,Balanced Growth,2.29%,6.3%,4.6%,5.1%
IGI1105,IG Mackenzie Ivy Balanced Fund,IGI,IG Wealth Management,Global Neutral Balanced,M,Balanced Growth,2.56%,1.7%,0.9%,2.2%
";
